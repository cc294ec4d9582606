//! Logging macros.
//!
//! Logging is routed to the `log` facade when the `log` feature is enabled, and compiled out otherwise.
//!
//! The arguments are still type-checked when compiled out, so that enabling the feature cannot break the build.

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        { log::trace!($($arg)*); }
        #[cfg(not(feature = "log"))]
        { if false { let _ = format_args!($($arg)*); } }
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        { log::debug!($($arg)*); }
        #[cfg(not(feature = "log"))]
        { if false { let _ = format_args!($($arg)*); } }
    };
}

macro_rules! warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        { log::warn!($($arg)*); }
        #[cfg(not(feature = "log"))]
        { if false { let _ = format_args!($($arg)*); } }
    };
}
