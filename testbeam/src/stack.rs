//! Stack capture helpers

use std::any::Any;
use std::backtrace::Backtrace;

/// Captures the current call stack as text.
///
/// Forced capture: classification needs the trace even when backtraces are
/// disabled for the process.
pub fn capture_stack() -> String {
    Backtrace::force_capture().to_string()
}

/// Best-effort extraction of a panic payload's message.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Trims the configured prefix from a suite name.
///
/// A leading `::` left over from the trim is removed too, so both
/// `my_crate` and `my_crate::` work as prefixes.
pub fn trim_suite_prefix<'a>(suite: &'a str, prefix: Option<&str>) -> &'a str {
    match prefix {
        Some(prefix) if !prefix.is_empty() => {
            let trimmed = suite.strip_prefix(prefix).unwrap_or(suite);
            let trimmed = trimmed.strip_prefix("::").unwrap_or(trimmed);
            if trimmed.is_empty() { suite } else { trimmed }
        }
        _ => suite,
    }
}
