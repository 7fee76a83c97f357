// src/macros.rs

//
// Connection lifecycle tracing.
//
// With the `logging` feature the events go to `tracing` at debug level;
// without it they compile away. Failures are returned to the caller, who
// decides whether and how loudly to report them.
//

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

pub(crate) use log_debug;
