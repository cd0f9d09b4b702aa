use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, Weak,
    },
};

/// Change signals broadcast after a successful write. No payload is
/// attached; listeners re-read what they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    TimersUpdated,
    CategoriesUpdated,
}

impl Signal {
    pub const ALL: [Signal; 2] = [Signal::TimersUpdated, Signal::CategoriesUpdated];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::TimersUpdated => "timers-updated",
            Signal::CategoriesUpdated => "categories-updated",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct NotifierInner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<Signal, HashMap<u64, Listener>>>,
}

impl NotifierInner {
    fn remove(&self, signal: Signal, id: u64) {
        let mut guard = match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(listeners) = guard.get_mut(&signal) {
            listeners.remove(&id);
        }
    }
}

/// In-process publisher for the two change signals. Cloning shares the
/// same listener set.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, signal: Signal, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = match self.inner.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .entry(signal)
            .or_default()
            .insert(id, Arc::new(listener));

        Subscription {
            notifier: Arc::downgrade(&self.inner),
            signal,
            id,
        }
    }

    /// Call every listener of `signal` synchronously. Listeners run after
    /// the registry lock is released, so they may subscribe or unsubscribe.
    pub fn emit(&self, signal: Signal) {
        let listeners: Vec<Listener> = {
            let guard = match self.inner.listeners.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard
                .get(&signal)
                .map(|listeners| listeners.values().cloned().collect())
                .unwrap_or_default()
        };

        log::debug!("emitting {signal} to {} listener(s)", listeners.len());
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self, signal: Signal) -> usize {
        let guard = match self.inner.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(&signal).map_or(0, HashMap::len)
    }
}

/// Registration handle; the listener is removed when this is dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    notifier: Weak<NotifierInner>,
    signal: Signal,
    id: u64,
}

impl Subscription {
    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.notifier.upgrade() {
            inner.remove(self.signal, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = count.clone();
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn emits_only_to_matching_signal() {
        let notifier = Notifier::new();
        let (timers, on_timers) = counter();
        let (categories, on_categories) = counter();
        let _a = notifier.subscribe(Signal::TimersUpdated, on_timers);
        let _b = notifier.subscribe(Signal::CategoriesUpdated, on_categories);

        notifier.emit(Signal::TimersUpdated);
        notifier.emit(Signal::TimersUpdated);

        assert_eq!(timers.load(Ordering::SeqCst), 2);
        assert_eq!(categories.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let notifier = Notifier::new();
        let (count, listener) = counter();
        let subscription = notifier.subscribe(Signal::TimersUpdated, listener);
        assert_eq!(notifier.listener_count(Signal::TimersUpdated), 1);

        subscription.unsubscribe();
        notifier.emit(Signal::TimersUpdated);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.listener_count(Signal::TimersUpdated), 0);
    }

    #[test]
    fn listeners_may_touch_the_notifier_while_dispatching() {
        let notifier = Notifier::new();
        let inner = notifier.clone();
        let _sub = notifier.subscribe(Signal::CategoriesUpdated, move || {
            let _ = inner.listener_count(Signal::CategoriesUpdated);
        });
        notifier.emit(Signal::CategoriesUpdated);
    }

    #[test]
    fn signal_names() {
        assert_eq!(Signal::TimersUpdated.to_string(), "timers-updated");
        assert_eq!(Signal::CategoriesUpdated.as_str(), "categories-updated");
    }
}
