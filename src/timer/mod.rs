pub mod clock;
pub mod countdown;

pub use clock::{ClockSubscription, CountdownClock, DEFAULT_TICK_INTERVAL};
pub use countdown::{remaining, remaining_for, Countdown, TimeRemaining};
