//! Logging for foundry.
//!
//! Events go through `tracing` with target "foundry" and carry an `event`
//! field. The library never installs a subscriber; binaries do.

/// Target for all foundry log events.
pub(crate) const FOUNDRY_TARGET: &str = "foundry";

/// Macro for debug-level log events.
///
/// # Example
/// ```ignore
/// log_debug!(
///     component = "mapping",
///     event = "mapping_parsed",
///     entries = entries.len(),
/// );
/// ```
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::FOUNDRY_TARGET, $($field)*)
    };
}

/// Macro for trace-level log events. Use for per-row or per-group events.
macro_rules! log_trace {
    ($($field:tt)*) => {
        ::tracing::trace!(target: $crate::observability::FOUNDRY_TARGET, $($field)*)
    };
}

/// Macro for warn-level log events.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::FOUNDRY_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_trace;
pub(crate) use log_warn;
