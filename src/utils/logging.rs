//! Logging macros gated by a per-module `ENABLE_LOGS` switch.
//!
//! Chatty subsystems (the tick loop, the dashboard refresher) keep their
//! output behind a module constant so it can be silenced at compile time
//! without touching `RUST_LOG` for the rest of the crate:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = false;
//! use crate::log_debug;
//!
//! log_debug!("tick at {}", now);
//! ```

/// `log::debug!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// `log::info!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}
