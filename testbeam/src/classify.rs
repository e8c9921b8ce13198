//! Failure classification
//!
//! Maps how control left a test body onto one terminal outcome. The
//! preferred signal is structured: `fail_now`/`fatal` raise a typed payload
//! the lifecycle wrapper recognizes. The text-signature classifier below is
//! the fallback for stacks produced by harnesses that only expose flat
//! trace text; a pattern miss keeps the coarser outcome and is never fatal.

use testbeam_core::tags;

/// Terminal state of a tracked test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Skipped,
    /// Failure flagged while execution continued.
    FailedNormal,
    /// Failure that halted the test body immediately.
    FailedAbrupt,
    /// Abrupt failure carrying an explicit message.
    FailedFatal,
    /// Unrecovered panic unwound through the test body.
    FailedPanic,
}

impl Outcome {
    /// Value of the status tag for this outcome.
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Passed => tags::TEST_STATUS_PASS,
            Outcome::Skipped => tags::TEST_STATUS_SKIP,
            _ => tags::TEST_STATUS_FAIL,
        }
    }

    /// Refined error-type tag value, where one applies.
    pub fn error_type(&self) -> Option<&'static str> {
        match self {
            Outcome::FailedAbrupt => Some("FailNow"),
            Outcome::FailedFatal => Some("Fatal"),
            Outcome::FailedPanic => Some("panic"),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::FailedNormal
                | Outcome::FailedAbrupt
                | Outcome::FailedFatal
                | Outcome::FailedPanic
        )
    }
}

/// Panic payload raised by `fail_now`/`fatal`.
///
/// Carrying the stack captured at the raise site gives the finalizer an
/// accurate trace; by the time the payload is caught the interesting frames
/// are gone.
pub struct AbruptFailure {
    pub message: Option<String>,
    pub stack: String,
}

/// Enumerated stack-text signatures for the fallback classifier.
#[derive(Debug, Clone)]
pub struct FailureSignatures {
    /// Frame substrings marking a fail-and-stop-immediately call.
    pub abrupt: Vec<String>,
    /// Frame substrings marking the message-carrying variant. Checked only
    /// after an abrupt signature matched.
    pub fatal: Vec<String>,
}

impl Default for FailureSignatures {
    fn default() -> Self {
        Self {
            abrupt: vec![
                "TrackedTest::fail_now".to_string(),
                "TrackedTest::fatal".to_string(),
            ],
            fatal: vec!["TrackedTest::fatal".to_string()],
        }
    }
}

/// Refines a flagged failure by scanning its captured stack text.
///
/// An abrupt signature upgrades to [`Outcome::FailedAbrupt`]; a fatal
/// signature within that upgrades further to [`Outcome::FailedFatal`]. No
/// match keeps [`Outcome::FailedNormal`].
pub fn refine_failure(stack: &str, signatures: &FailureSignatures) -> Outcome {
    if signatures.abrupt.iter().any(|sig| stack.contains(sig.as_str())) {
        if signatures.fatal.iter().any(|sig| stack.contains(sig.as_str())) {
            Outcome::FailedFatal
        } else {
            Outcome::FailedAbrupt
        }
    } else {
        Outcome::FailedNormal
    }
}
