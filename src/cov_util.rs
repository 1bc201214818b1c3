//! Logging wrappers around the `log` facade.
//!
//! Coverage builds (`cfg(coverage)`) compile every log statement out so that formatting arguments do not show up as
//! uncovered branches.  Everything in the library logs through these macros rather than `log::*` directly.

#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(not(coverage))]
        {
            log::trace!(target: $target, $($arg)+);
        }
    };
    ($($arg:tt)+) => {
        #[cfg(not(coverage))]
        {
            log::trace!($($arg)+);
        }
     };
}

#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(not(coverage))]
        {
            log::debug!(target: $target, $($arg)+);
        }
    };
    ($($arg:tt)+) => {
        #[cfg(not(coverage))]
        {
            log::debug!($($arg)+);
        }
     };
}

#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(not(coverage))]
        {
            log::info!(target: $target, $($arg)+);
        }
    };
    ($($arg:tt)+) => {
        #[cfg(not(coverage))]
        {
            log::info!($($arg)+);
        }
     };
}

#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(not(coverage))]
        {
            log::warn!(target: $target, $($arg)+);
        }
    };
    ($($arg:tt)+) => {
        #[cfg(not(coverage))]
        {
            log::warn!($($arg)+);
        }
     };
}
