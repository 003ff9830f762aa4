//! Per-module switchable logging for the sampling and fusion loops.
//!
//! Those loops log on every tick, so each module that uses these macros owns a
//! flag that silences them without touching `RUST_LOG`:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_warn};
//!
//! log_warn!("voice sample failed: {err}");
//! ```
//!
//! The flag is resolved at the call site, so it must be in scope wherever a
//! macro is expanded.

#[doc(hidden)]
#[macro_export]
macro_rules! __gated_log {
    ($level:ident, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::$level!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::__gated_log!(debug, $($arg)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::__gated_log!(info, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::__gated_log!(warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::__gated_log!(error, $($arg)*) };
}
