//! The timer list: sorted timers plus per-tick card rendering.

use std::{
    cmp::Ordering,
    fmt,
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::{
    timer::{remaining, ClockSubscription, Countdown, CountdownClock},
    timers::{Signal, Subscription, Timer, TimerRepository},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

pub const INVALID_DATE_TEXT: &str = "Invalid date";
const EMPTY_CELL: &str = "--";
const CELL_LABELS: [&str; 4] = ["Days", "Hours", "Minutes", "Seconds"];

/// Ascending by target instant; unparseable targets sort last. Stable, so
/// equal targets keep their stored order.
pub fn sort_timers(mut timers: Vec<Timer>) -> Vec<Timer> {
    timers.sort_by(|a, b| compare_targets(a.target_instant(), b.target_instant()));
    timers
}

fn compare_targets(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CardStatus {
    Upcoming,
    Passed,
    Invalid,
}

impl CardStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CardStatus::Upcoming => "Event is upcoming",
            CardStatus::Passed => "Event has passed",
            CardStatus::Invalid => INVALID_DATE_TEXT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownCell {
    pub label: &'static str,
    pub value: String,
}

/// One timer as displayed at a given tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerCard {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub status: CardStatus,
    pub cells: Vec<CountdownCell>,
    /// Human-readable target, or `Invalid date`.
    pub target: String,
}

impl TimerCard {
    pub fn render(timer: &Timer, now: DateTime<Utc>) -> Self {
        Self::render_in(timer, now, &Local)
    }

    pub fn render_in<Tz: TimeZone>(timer: &Timer, now: DateTime<Utc>, tz: &Tz) -> Self {
        let target = timer.target_instant();
        let countdown = remaining(target, now);

        let (status, values) = match countdown {
            Countdown::Invalid => (CardStatus::Invalid, None),
            Countdown::Remaining(r) => {
                let status = if r.is_elapsed() {
                    CardStatus::Passed
                } else {
                    CardStatus::Upcoming
                };
                (status, Some([r.days, r.hours, r.minutes, r.seconds]))
            }
        };

        let cells = CELL_LABELS
            .iter()
            .enumerate()
            .map(|(i, &label)| CountdownCell {
                label,
                value: values
                    .map(|v| format!("{:02}", v[i]))
                    .unwrap_or_else(|| EMPTY_CELL.to_string()),
            })
            .collect();

        let target = match target {
            Some(target) => target
                .with_timezone(tz)
                .naive_local()
                .format("%A, %B %-d, %Y at %-I:%M %p")
                .to_string(),
            None => INVALID_DATE_TEXT.to_string(),
        };

        Self {
            id: timer.id.clone(),
            name: timer.name.clone(),
            category: timer.has_category().then(|| timer.category.clone()),
            status,
            cells,
            target,
        }
    }
}

impl fmt::Display for TimerCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(category) = &self.category {
            write!(f, " [{category}]")?;
        }
        writeln!(f, "  ({})", self.id)?;

        if self.status == CardStatus::Invalid {
            return write!(f, "  {INVALID_DATE_TEXT}");
        }

        let cells: Vec<String> = self
            .cells
            .iter()
            .map(|cell| format!("{} {}", cell.value, cell.label))
            .collect();
        writeln!(f, "  {}", cells.join("  "))?;
        write!(f, "  {}  |  {}", self.target, self.status.label())
    }
}

/// Cards for an already-sorted list.
pub fn render_cards(timers: &[Timer], now: DateTime<Utc>) -> Vec<TimerCard> {
    timers.iter().map(|t| TimerCard::render(t, now)).collect()
}

struct Snapshot {
    applied: u64,
    timers: Vec<Timer>,
}

struct DashboardInner {
    repo: TimerRepository,
    issued: Mutex<u64>,
    snapshot: Mutex<Snapshot>,
    dirty: Notify,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl DashboardInner {
    /// Fetch and apply, unless a later fetch already landed.
    async fn reload(&self) {
        let ticket = {
            let mut issued = lock(&self.issued);
            *issued += 1;
            *issued
        };

        let timers = sort_timers(self.repo.read_timers().await);

        let mut snapshot = lock(&self.snapshot);
        if ticket > snapshot.applied {
            log_debug!("dashboard loaded {} timer(s)", timers.len());
            snapshot.applied = ticket;
            snapshot.timers = timers;
        } else {
            log_debug!("dropping stale timer fetch #{ticket}");
        }
    }
}

/// Live, sorted view of the stored timers.
///
/// Re-fetches whenever `timers-updated` fires (writes and `refresh()`).
/// Dropping the dashboard cancels the background refresher; fetches that
/// complete afterwards are discarded.
pub struct Dashboard {
    inner: Arc<DashboardInner>,
    token: CancellationToken,
    _updates: Subscription,
}

impl Dashboard {
    pub async fn open(repo: TimerRepository) -> Self {
        let inner = Arc::new(DashboardInner {
            repo: repo.clone(),
            issued: Mutex::new(0),
            snapshot: Mutex::new(Snapshot {
                applied: 0,
                timers: Vec::new(),
            }),
            dirty: Notify::new(),
        });

        let weak = Arc::downgrade(&inner);
        let updates = repo.subscribe(Signal::TimersUpdated, move || {
            if let Some(inner) = weak.upgrade() {
                inner.dirty.notify_one();
            }
        });

        inner.reload().await;

        let token = CancellationToken::new();
        tokio::spawn(run_refresher(Arc::downgrade(&inner), token.clone()));
        log_info!("dashboard opened");

        Self {
            inner,
            token,
            _updates: updates,
        }
    }

    pub fn timers(&self) -> Vec<Timer> {
        lock(&self.inner.snapshot).timers.clone()
    }

    pub fn cards(&self, now: DateTime<Utc>) -> Vec<TimerCard> {
        render_cards(&lock(&self.inner.snapshot).timers, now)
    }

    /// Re-fetch immediately, bypassing the notification path.
    pub async fn reload(&self) {
        self.inner.reload().await;
    }

    /// Render every card on each clock tick.
    pub fn on_tick<F>(&self, clock: &CountdownClock, render: F) -> ClockSubscription
    where
        F: Fn(DateTime<Utc>, Vec<TimerCard>) + Send + Sync + 'static,
    {
        let weak: Weak<DashboardInner> = Arc::downgrade(&self.inner);
        clock.subscribe(move |now| {
            if let Some(inner) = weak.upgrade() {
                let cards = render_cards(&lock(&inner.snapshot).timers, now);
                render(now, cards);
            }
        })
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_refresher(inner: Weak<DashboardInner>, token: CancellationToken) {
    loop {
        let Some(strong) = inner.upgrade() else {
            break;
        };

        tokio::select! {
            _ = token.cancelled() => break,
            _ = strong.dirty.notified() => {}
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = strong.reload() => {}
        }
    }
}
