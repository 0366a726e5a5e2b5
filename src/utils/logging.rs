//! Conditional logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! Chatty loops (the recording ticker, most of all) define
//! `const ENABLE_LOGS: bool = ...;` and log through these macros, so their
//! per-tick output can be switched off without touching the log filter
//! everything else uses.

/// Logs at info level when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Logs at warn level when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Logs at error level when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
