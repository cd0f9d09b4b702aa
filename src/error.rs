//! Error types shared across the storage, request and repository layers.

use thiserror::Error;

/// Failure at the key-value storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened, read or written.
    #[error("storage unavailable: {0:#}")]
    Unavailable(anyhow::Error),
}

impl StoreError {
    pub fn unavailable(err: impl Into<anyhow::Error>) -> Self {
        StoreError::Unavailable(err.into())
    }
}

/// Failure while routing a request through the local adapter.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid request url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request failed with status {status} ({status_text})")]
    Status { status: u16, status_text: String },

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Form-level rejection, raised before any write is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Event name is required.")]
    EmptyName,

    #[error("Category name is required.")]
    EmptyCategory,

    #[error("Choose a future date.")]
    MissingDate,

    #[error("Selected date and time is invalid.")]
    InvalidDate,

    #[error("Choose a date and time in the future.")]
    PastDate,
}

/// Outcome of the create/edit flow.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The timer being edited is no longer stored.
    #[error("Timer '{id}' no longer exists.")]
    NotFound { id: String },

    #[error("Unable to save timer. Please try again.")]
    Request(#[from] RequestError),
}
