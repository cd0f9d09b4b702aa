//! Create/edit form input and its validation.
//!
//! The form collects a calendar date plus a 12-hour clock time. Validation
//! happens here, before anything touches storage.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use crate::error::ValidationError;

use super::models::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    /// Anything other than `PM` (any case) is `AM`.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("pm") {
            Meridiem::Pm
        } else {
            Meridiem::Am
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Meridiem::Am => "AM",
            Meridiem::Pm => "PM",
        }
    }
}

/// Which category the timer is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryChoice {
    #[default]
    None,
    /// A label picked from the existing options.
    Existing(String),
    /// The "Add New" path: a label typed by the user.
    New(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerDraft {
    pub name: String,
    /// `YYYY-MM-DD`; empty when nothing was picked.
    pub date: String,
    pub hour: String,
    pub minute: String,
    pub meridiem: String,
    pub category: CategoryChoice,
}

impl Default for TimerDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            date: String::new(),
            hour: "12".into(),
            minute: "00".into(),
            meridiem: "AM".into(),
            category: CategoryChoice::None,
        }
    }
}

impl TimerDraft {
    /// Pre-fill the form from a stored timer, in the given timezone.
    pub fn from_timer<Tz: TimeZone>(timer: &Timer, tz: &Tz) -> Self {
        let category = if timer.has_category() {
            CategoryChoice::Existing(timer.category.trim().to_string())
        } else {
            CategoryChoice::None
        };

        let mut draft = Self {
            name: timer.name.clone(),
            category,
            ..Self::default()
        };

        if let Some(target) = timer.target_instant() {
            let local = target.with_timezone(tz);
            let (hour, meridiem) = convert_24_hour_to_12_hour(i64::from(local.hour()));
            draft.date = local.date_naive().format("%Y-%m-%d").to_string();
            draft.hour = hour;
            draft.minute = format!("{:02}", local.minute());
            draft.meridiem = meridiem.as_str().to_string();
        }

        draft
    }

    pub fn trimmed_name(&self) -> Result<String, ValidationError> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(trimmed.to_string())
    }

    /// Resolve date and time in `tz`; the result must lie after `now`.
    pub fn target_instant<Tz: TimeZone>(
        &self,
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ValidationError> {
        let date = self.date.trim();
        if date.is_empty() {
            return Err(ValidationError::MissingDate);
        }

        let date =
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate)?;
        let time = NaiveTime::parse_from_str(
            &formatted_24_hour_time(&self.hour, &self.minute, &self.meridiem),
            "%H:%M",
        )
        .map_err(|_| ValidationError::InvalidDate)?;

        let target = tz
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .ok_or(ValidationError::InvalidDate)?
            .with_timezone(&Utc);

        if target <= now {
            return Err(ValidationError::PastDate);
        }

        Ok(target)
    }
}

/// `HH:MM` from a 12-hour clock reading. Hours outside 1..=12 count as 12.
pub fn formatted_24_hour_time(hour: &str, minute: &str, meridiem: &str) -> String {
    let hour = match hour.trim().parse::<u32>() {
        Ok(h) if (1..=12).contains(&h) => h,
        _ => 12,
    };

    let hour = match (Meridiem::parse(meridiem), hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Am, h) => h,
        (Meridiem::Pm, 12) => 12,
        (Meridiem::Pm, h) => h + 12,
    };

    format!("{hour:02}:{minute:0>2}")
}

/// 24-hour to 12-hour clock; out-of-range hours read as midnight.
pub fn convert_24_hour_to_12_hour(hour: i64) -> (String, Meridiem) {
    match hour {
        0 => ("12".into(), Meridiem::Am),
        12 => ("12".into(), Meridiem::Pm),
        13..=23 => ((hour - 12).to_string(), Meridiem::Pm),
        1..=11 => (hour.to_string(), Meridiem::Am),
        _ => ("12".into(), Meridiem::Am),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
    }

    fn draft(date: &str, hour: &str, minute: &str, meridiem: &str) -> TimerDraft {
        TimerDraft {
            name: "Launch".into(),
            date: date.into(),
            hour: hour.into(),
            minute: minute.into(),
            meridiem: meridiem.into(),
            category: CategoryChoice::None,
        }
    }

    #[test]
    fn twelve_hour_clock_conversion() {
        assert_eq!(formatted_24_hour_time("12", "00", "AM"), "00:00");
        assert_eq!(formatted_24_hour_time("12", "30", "PM"), "12:30");
        assert_eq!(formatted_24_hour_time("7", "5", "pm"), "19:05");
        assert_eq!(formatted_24_hour_time("13", "15", "AM"), "00:15");
        assert_eq!(formatted_24_hour_time("x", "45", "noon"), "00:45");
    }

    #[test]
    fn twenty_four_hour_to_twelve() {
        assert_eq!(convert_24_hour_to_12_hour(0), ("12".into(), Meridiem::Am));
        assert_eq!(convert_24_hour_to_12_hour(9), ("9".into(), Meridiem::Am));
        assert_eq!(convert_24_hour_to_12_hour(12), ("12".into(), Meridiem::Pm));
        assert_eq!(convert_24_hour_to_12_hour(23), ("11".into(), Meridiem::Pm));
        assert_eq!(convert_24_hour_to_12_hour(24), ("12".into(), Meridiem::Am));
        assert_eq!(convert_24_hour_to_12_hour(-1), ("12".into(), Meridiem::Am));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut d = draft("2030-07-01", "9", "00", "AM");
        d.name = "   ".into();
        assert_eq!(d.trimmed_name(), Err(ValidationError::EmptyName));
        d.name = "  Trip ".into();
        assert_eq!(d.trimmed_name().unwrap(), "Trip");
    }

    #[test]
    fn resolves_future_target_in_timezone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let target = draft("2030-07-01", "9", "30", "PM")
            .target_instant(&tz, now())
            .unwrap();
        assert_eq!(target, Utc.with_ymd_and_hms(2030, 7, 1, 19, 30, 0).unwrap());
    }

    #[test]
    fn date_errors_are_distinguished() {
        assert_eq!(
            draft("", "9", "00", "AM").target_instant(&Utc, now()),
            Err(ValidationError::MissingDate)
        );
        assert_eq!(
            draft("2030-13-45", "9", "00", "AM").target_instant(&Utc, now()),
            Err(ValidationError::InvalidDate)
        );
        assert_eq!(
            draft("2030-07-01", "9", "75", "AM").target_instant(&Utc, now()),
            Err(ValidationError::InvalidDate)
        );
        assert_eq!(
            draft("2030-06-01", "12", "00", "PM").target_instant(&Utc, now()),
            Err(ValidationError::PastDate)
        );
    }

    #[test]
    fn hydrates_from_stored_timer() {
        let timer = Timer {
            id: "t".into(),
            name: "Concert".into(),
            category: " Music ".into(),
            target_date: "2030-08-09T21:05:00.000Z".into(),
            created_at: None,
            updated_at: None,
        };

        let d = TimerDraft::from_timer(&timer, &Utc);
        assert_eq!(d.date, "2030-08-09");
        assert_eq!(d.hour, "9");
        assert_eq!(d.minute, "05");
        assert_eq!(d.meridiem, "PM");
        assert_eq!(d.category, CategoryChoice::Existing("Music".into()));
    }

    #[test]
    fn hydrating_an_invalid_timer_keeps_defaults() {
        let timer = Timer {
            id: "t".into(),
            name: "Broken".into(),
            category: String::new(),
            target_date: "not a date".into(),
            created_at: None,
            updated_at: None,
        };

        let d = TimerDraft::from_timer(&timer, &Utc);
        assert_eq!(d.date, "");
        assert_eq!(d.hour, "12");
        assert_eq!(d.category, CategoryChoice::None);
    }
}
