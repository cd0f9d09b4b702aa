//! Routed request interface over the local key-value store.
//!
//! Two resources exist, `/timers` and `/categories`, each answering `GET`
//! (the stored list, or `[]` if never written) and `PUT` (replace the stored
//! list). Everything else is a 404.

mod payload;
mod routing;

use std::sync::Arc;

use log::debug;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    db::{KeyValueStore, CATEGORIES_KEY, TIMERS_KEY},
    error::RequestError,
};

pub use payload::{normalize_array_payload, parse_body};
pub use routing::{combine_url, request_path, DEFAULT_BASE_URL};

pub const TIMERS_ENDPOINT: &str = "/timers";
pub const CATEGORIES_ENDPOINT: &str = "/categories";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub data: Value,
}

impl Response {
    fn ok(data: Value) -> Self {
        Self {
            status: 200,
            status_text: "OK".into(),
            data,
        }
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            status_text: "Not Found".into(),
            data: json!({ "message": "Not Found" }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn resource_key(path: &str) -> Option<&'static str> {
    match path {
        TIMERS_ENDPOINT => Some(TIMERS_KEY),
        CATEGORIES_ENDPOINT => Some(CATEGORIES_KEY),
        _ => None,
    }
}

#[derive(Clone)]
pub struct RequestAdapter {
    store: Arc<dyn KeyValueStore>,
    base_url: String,
}

impl RequestAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Route one request. Storage failures are errors; unknown routes are a
    /// 404 response, not an error.
    pub async fn handle(&self, request: Request) -> Result<Response, RequestError> {
        let full_url = combine_url(&self.base_url, &request.url);
        let path = request_path(&full_url)?;
        self.store.open().await?;

        debug!("{} {} -> {}", request.method.as_str(), request.url, path);

        let Some(key) = resource_key(&path) else {
            return Ok(Response::not_found());
        };

        match request.method {
            Method::Get => {
                let value = self
                    .store
                    .get(key)
                    .await?
                    .unwrap_or_else(|| Value::Array(Vec::new()));
                Ok(Response::ok(value))
            }
            Method::Put => {
                let payload = normalize_array_payload(parse_body(request.body));
                let committed = self.store.put(key, Value::Array(payload)).await?;
                Ok(Response::ok(committed))
            }
            _ => Ok(Response::not_found()),
        }
    }

    pub async fn get(&self, url: &str) -> Result<Value, RequestError> {
        self.send(Request::get(url)).await
    }

    pub async fn put(&self, url: &str, body: Value) -> Result<Value, RequestError> {
        self.send(Request::put(url, body)).await
    }

    async fn send(&self, request: Request) -> Result<Value, RequestError> {
        let response = self.handle(request).await?;
        if !response.is_success() {
            return Err(RequestError::Status {
                status: response.status,
                status_text: response.status_text,
            });
        }
        Ok(response.data)
    }
}
