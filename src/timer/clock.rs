use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, Weak},
    time::Duration,
};

use chrono::{DateTime, Utc};
use log::warn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// Tick-level logging is noisy; flip on when debugging the clock.
const ENABLE_LOGS: bool = false;

use crate::log_debug;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

type TickListener = Arc<dyn Fn(DateTime<Utc>) + Send + Sync>;

struct Runner {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct ClockState {
    next_id: u64,
    listeners: HashMap<u64, TickListener>,
    runner: Option<Runner>,
    last_tick: DateTime<Utc>,
}

struct ClockInner {
    interval: Duration,
    state: Mutex<ClockState>,
}

impl ClockInner {
    fn lock(&self) -> MutexGuard<'_, ClockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Deliver one tick: every listener sees the same instant.
    fn fire(&self, now: DateTime<Utc>) {
        let listeners: Vec<TickListener> = {
            let mut state = self.lock();
            state.last_tick = now;
            state.listeners.values().cloned().collect()
        };

        log_debug!("tick {} -> {} listener(s)", now, listeners.len());
        for listener in listeners {
            listener(now);
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut state = self.lock();
        state.listeners.remove(&id);

        if state.listeners.is_empty() {
            if let Some(runner) = state.runner.take() {
                log_debug!("last listener left; stopping clock");
                runner.token.cancel();
            }
        }
    }
}

/// One ticking source shared by every countdown display.
///
/// The clock runs only while it has subscribers: the first subscription
/// starts a single background task, the last unsubscribe cancels it. The
/// task sleeps for the interval, fires, then re-arms, so a slow tick delays
/// the next one instead of stacking up.
#[derive(Clone)]
pub struct CountdownClock {
    inner: Arc<ClockInner>,
}

impl Default for CountdownClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl CountdownClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                interval,
                state: Mutex::new(ClockState {
                    next_id: 0,
                    listeners: HashMap::new(),
                    runner: None,
                    last_tick: Utc::now(),
                }),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Instant of the most recent tick (creation time before the first).
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.lock().last_tick
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .lock()
            .runner
            .as_ref()
            .is_some_and(|runner| !runner.handle.is_finished())
    }

    /// Register a tick listener. Must be called from within a Tokio runtime
    /// for the clock to start.
    pub fn subscribe<F>(&self, listener: F) -> ClockSubscription
    where
        F: Fn(DateTime<Utc>) + Send + Sync + 'static,
    {
        let mut state = self.inner.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.insert(id, Arc::new(listener));

        let needs_runner = state
            .runner
            .as_ref()
            .map_or(true, |runner| runner.handle.is_finished());
        if needs_runner {
            state.runner = self.spawn_runner();
        }

        ClockSubscription {
            clock: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    fn spawn_runner(&self) -> Option<Runner> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                warn!("countdown clock not started outside a Tokio runtime: {err}");
                return None;
            }
        };

        let token = CancellationToken::new();
        let handle = runtime.spawn(run_clock(
            Arc::downgrade(&self.inner),
            self.inner.interval,
            token.clone(),
        ));
        log_debug!("clock started ({:?} interval)", self.inner.interval);

        Some(Runner { token, handle })
    }
}

async fn run_clock(clock: Weak<ClockInner>, interval: Duration, token: CancellationToken) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let Some(inner) = clock.upgrade() else {
            break;
        };
        inner.fire(Utc::now());
    }
}

/// Disposer for a clock listener; unsubscribes on drop.
#[must_use = "dropping a ClockSubscription unsubscribes immediately"]
pub struct ClockSubscription {
    clock: Weak<ClockInner>,
    id: Option<u64>,
}

impl ClockSubscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let (Some(id), Some(inner)) = (self.id.take(), self.clock.upgrade()) {
            inner.unsubscribe(id);
        }
    }
}

impl Drop for ClockSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
