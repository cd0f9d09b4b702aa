use chrono::{DateTime, Utc};
use serde::Serialize;

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = MS_PER_SECOND * 60;
const MS_PER_HOUR: i64 = MS_PER_MINUTE * 60;
const MS_PER_DAY: i64 = MS_PER_HOUR * 24;

/// Remaining time until a target, split into display components.
///
/// `total_ms` is signed: zero or negative means the target has passed.
/// The components are derived from `max(total_ms, 0)` and never go
/// negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRemaining {
    pub total_ms: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeRemaining {
    pub fn from_total_ms(total_ms: i64) -> Self {
        let clamped = total_ms.max(0);
        Self {
            total_ms,
            days: clamped / MS_PER_DAY,
            hours: (clamped % MS_PER_DAY) / MS_PER_HOUR,
            minutes: (clamped % MS_PER_HOUR) / MS_PER_MINUTE,
            seconds: (clamped % MS_PER_MINUTE) / MS_PER_SECOND,
        }
    }

    pub fn is_elapsed(&self) -> bool {
        self.total_ms <= 0
    }
}

/// Result of a countdown computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Countdown {
    /// The target could not be parsed; no component is meaningful.
    Invalid,
    Remaining(TimeRemaining),
}

impl Countdown {
    pub fn is_elapsed(&self) -> bool {
        matches!(self, Countdown::Remaining(r) if r.is_elapsed())
    }

    pub fn time_remaining(&self) -> Option<&TimeRemaining> {
        match self {
            Countdown::Remaining(r) => Some(r),
            Countdown::Invalid => None,
        }
    }
}

pub fn remaining(target: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Countdown {
    match target {
        Some(target) => {
            Countdown::Remaining(TimeRemaining::from_total_ms((target - now).num_milliseconds()))
        }
        None => Countdown::Invalid,
    }
}

/// Countdown for raw target text as stored on a timer.
pub fn remaining_for(target_date: &str, now: DateTime<Utc>) -> Countdown {
    remaining(crate::timers::parse_instant(target_date), now)
}
