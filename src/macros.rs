//! Logging shims for the cold allocation paths.
//!
//! With the `tracing` feature enabled these forward to the `tracing` macros;
//! without it they expand to nothing.

macro_rules! debug_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!($($arg)*);
    };
}

macro_rules! trace_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
    };
}

pub(crate) use debug_event;
pub(crate) use trace_event;
