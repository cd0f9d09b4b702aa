use chrono::{DateTime, Local, TimeZone, Utc};
use log::{info, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    api::{normalize_array_payload, RequestAdapter, CATEGORIES_ENDPOINT, TIMERS_ENDPOINT},
    error::{RequestError, SaveError, ValidationError},
};

use super::{
    categories::{category_options, find_label, merge_category_labels},
    form::{CategoryChoice, TimerDraft},
    models::{category_label, format_instant, CategoryOption, Timer},
    notifier::{Notifier, Signal, Subscription},
};

/// Typed access to the timer and category collections.
///
/// Reads never fail: storage problems degrade to an empty list plus a
/// warning. Writes propagate errors and only notify on success.
#[derive(Clone)]
pub struct TimerRepository {
    client: RequestAdapter,
    notifier: Notifier,
}

impl TimerRepository {
    pub fn new(client: RequestAdapter, notifier: Notifier) -> Self {
        Self { client, notifier }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn subscribe<F>(&self, signal: Signal, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.subscribe(signal, listener)
    }

    /// Foreground trigger from the host: every listener re-fetches.
    pub fn refresh(&self) {
        info!("refresh requested; notifying listeners");
        for signal in Signal::ALL {
            self.notifier.emit(signal);
        }
    }

    pub async fn read_timers(&self) -> Vec<Timer> {
        decode_timers(self.read_timer_records().await)
    }

    pub async fn write_timers(&self, timers: &[Timer]) -> Result<Vec<Timer>, RequestError> {
        let records = timers
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let committed = self.write_timer_records(records).await?;
        Ok(decode_timers(normalize_array_payload(committed)))
    }

    /// Stored timer entries, undecoded. Rewrites go through these so that
    /// entries `Timer` cannot decode are carried over untouched.
    async fn read_timer_records(&self) -> Vec<Value> {
        match self.client.get(TIMERS_ENDPOINT).await {
            Ok(data) => normalize_array_payload(data),
            Err(err) => {
                warn!("Unable to read timers from storage: {err}");
                Vec::new()
            }
        }
    }

    async fn write_timer_records(&self, records: Vec<Value>) -> Result<Value, RequestError> {
        match self.client.put(TIMERS_ENDPOINT, Value::Array(records)).await {
            Ok(committed) => {
                self.notifier.emit(Signal::TimersUpdated);
                Ok(committed)
            }
            Err(err) => {
                warn!("Unable to write timers to storage: {err}");
                Err(err)
            }
        }
    }

    pub async fn read_categories(&self) -> Vec<String> {
        match self.client.get(CATEGORIES_ENDPOINT).await {
            Ok(data) => normalize_array_payload(data)
                .into_iter()
                .filter_map(category_label)
                .collect(),
            Err(err) => {
                warn!("Unable to read categories from storage: {err}");
                Vec::new()
            }
        }
    }

    pub async fn write_categories(&self, labels: &[String]) -> Result<Vec<String>, RequestError> {
        let payload = Value::Array(labels.iter().cloned().map(Value::String).collect());
        match self.client.put(CATEGORIES_ENDPOINT, payload).await {
            Ok(committed) => {
                self.notifier.emit(Signal::CategoriesUpdated);
                Ok(normalize_array_payload(committed)
                    .into_iter()
                    .filter_map(|value| match value {
                        Value::String(label) => Some(label),
                        _ => None,
                    })
                    .collect())
            }
            Err(err) => {
                warn!("Unable to write categories to storage: {err}");
                Err(err)
            }
        }
    }

    /// Stored labels merged with `extra`, as selectable options.
    pub async fn category_options(&self, extra: &[String]) -> Vec<CategoryOption> {
        let stored = self.read_categories().await;
        category_options(&merge_category_labels([stored.as_slice(), extra]))
    }

    /// Remove a timer by id. Returns `false`, without writing or notifying,
    /// when no timer has that id.
    pub async fn delete_timer(&self, id: &str) -> Result<bool, RequestError> {
        let records = self.read_timer_records().await;
        let before = records.len();
        let remaining: Vec<Value> = records
            .into_iter()
            .filter(|record| record_id(record) != Some(id))
            .collect();

        if remaining.len() == before {
            return Ok(false);
        }

        self.write_timer_records(remaining).await?;
        info!("Deleted timer {id}");
        Ok(true)
    }

    /// Create (`editing` is `None`) or update a timer from form input,
    /// reading the date in the local timezone.
    pub async fn save_timer(
        &self,
        draft: &TimerDraft,
        editing: Option<&Timer>,
        now: DateTime<Utc>,
    ) -> Result<Timer, SaveError> {
        self.save_timer_in(draft, editing, now, &Local).await
    }

    pub async fn save_timer_in<Tz: TimeZone>(
        &self,
        draft: &TimerDraft,
        editing: Option<&Timer>,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<Timer, SaveError> {
        let name = draft.trimmed_name()?;

        let (category, new_label) = match &draft.category {
            CategoryChoice::None => (String::new(), None),
            CategoryChoice::Existing(label) => (label.trim().to_string(), None),
            CategoryChoice::New(candidate) => {
                let candidate = candidate.trim();
                if candidate.is_empty() {
                    return Err(ValidationError::EmptyCategory.into());
                }

                let mut known = self.read_categories().await;
                if let Some(timer) = editing.filter(|t| t.has_category()) {
                    known.push(timer.category.clone());
                }

                match find_label(&known, candidate) {
                    Some(existing) => (existing.trim().to_string(), None),
                    None => (candidate.to_string(), Some(candidate.to_string())),
                }
            }
        };

        let target = draft.target_instant(tz, now)?;

        let timer = Timer {
            id: editing
                .map(|t| t.id.clone())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name,
            category,
            target_date: format_instant(target),
            created_at: Some(editing.and_then(|t| t.created_at).unwrap_or(now)),
            updated_at: Some(now),
        };

        let record = serde_json::to_value(&timer).map_err(RequestError::from)?;
        let mut records = self.read_timer_records().await;
        if editing.is_some() {
            let mut replaced = false;
            for slot in records
                .iter_mut()
                .filter(|r| record_id(r) == Some(timer.id.as_str()))
            {
                *slot = record.clone();
                replaced = true;
            }
            if !replaced {
                warn!("Timer {} vanished before the edit was saved", timer.id);
                return Err(SaveError::NotFound { id: timer.id });
            }
        } else {
            records.push(record);
        }

        self.write_timer_records(records).await?;

        if let Some(label) = new_label {
            let stored = self.read_categories().await;
            let labels = merge_category_labels([stored, vec![label]]);
            self.write_categories(&labels).await?;
        }

        Ok(timer)
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn decode_timers(records: Vec<Value>) -> Vec<Timer> {
    records
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Timer>(value) {
            Ok(timer) => Some(timer),
            Err(err) => {
                warn!("Skipping malformed timer record: {err}");
                None
            }
        })
        .collect()
}
