//! Timer and category data models.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user-defined countdown target.
///
/// `target_date` stays as the stored text so a record with an unparseable
/// date still loads; use [`Timer::target_instant`] to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub target_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Timer {
    pub fn target_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.target_date)
    }

    pub fn has_category(&self) -> bool {
        !self.category.trim().is_empty()
    }
}

/// ISO-8601 UTC text with millisecond precision, e.g. `2030-01-01T09:30:00.000Z`.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A stored category entry: either a bare label or an object carrying one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryEntry {
    Label(String),
    Object {
        #[serde(default)]
        label: Option<Value>,
        #[serde(default)]
        name: Option<Value>,
        #[serde(default)]
        value: Option<Value>,
    },
}

/// Extract a non-blank label from a raw category entry.
///
/// Objects use the first present field of `label`, `name`, `value`; that
/// field must be a string or the entry is dropped.
pub fn category_label(entry: Value) -> Option<String> {
    let label = match serde_json::from_value::<CategoryEntry>(entry).ok()? {
        CategoryEntry::Label(label) => label,
        CategoryEntry::Object { label, name, value } => {
            match label.or(name).or(value)? {
                Value::String(label) => label,
                _ => return None,
            }
        }
    };

    if label.trim().is_empty() {
        None
    } else {
        Some(label)
    }
}

/// A selectable category: stable slug plus display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub value: String,
    pub label: String,
}

pub const DEFAULT_CATEGORY_SLUG: &str = "custom-category";

impl CategoryOption {
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim();
        let slug = slugify(normalized);
        let value = if slug.is_empty() {
            fallback_slug(normalized)
        } else {
            slug
        };

        Self {
            value,
            label: normalized.to_string(),
        }
    }
}

/// Lowercase, runs outside `[a-z0-9]` collapsed to one hyphen, edge
/// hyphens trimmed.
fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_hyphen = false;

    for c in label.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

fn fallback_slug(label: &str) -> String {
    let joined = label
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    if joined.is_empty() {
        DEFAULT_CATEGORY_SLUG.to_string()
    } else {
        joined
    }
}
