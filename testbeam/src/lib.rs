//! Testbeam
//!
//! Test-telemetry SDK: detects the hosting CI platform from the process
//! environment, normalizes a provenance tag set, and tracks every test
//! execution as a span-like record with a classified outcome.
//!
//! Architecture:
//! - Configuration: session settings from code or `TESTBEAM_*` variables
//! - Session: application-lifetime context owning sink, tags and shutdown
//! - Lifecycle: one tracked record per test, finalized exactly once
//! - Classification: structured abrupt-failure signal with a text-signature
//!   fallback
//! - Shutdown: one flush/stop per process, shared by normal completion,
//!   panic unwind and termination signals
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use testbeam::{Session, SessionConfig};
//! use testbeam_sink::RecordingSink;
//!
//! let sink = Arc::new(RecordingSink::new());
//! let session = Session::start(
//!     SessionConfig::new().with_signal_listener(false),
//!     sink.clone(),
//! )
//! .unwrap();
//!
//! session.test("my_crate::parser", "parses_empty_input").run(|t| {
//!     if false {
//!         t.fail("parser returned garbage");
//!     }
//! });
//!
//! session.shutdown();
//! ```

pub mod classify;
pub mod config;
pub mod lifecycle;
pub mod session;
pub mod shutdown;
pub mod stack;

pub use classify::{FailureSignatures, Outcome};
pub use config::SessionConfig;
pub use lifecycle::{TestKind, TrackedTest};
pub use session::{DEFAULT_SERVICE, Session};
pub use shutdown::ShutdownCoordinator;

/// Opens and runs a tracked test, supplying the enclosing module as the
/// suite name.
///
/// ```
/// use std::sync::Arc;
/// use testbeam::{Session, SessionConfig, tracked_test};
/// use testbeam_sink::RecordingSink;
///
/// let sink = Arc::new(RecordingSink::new());
/// let session = Session::start(
///     SessionConfig::new().with_signal_listener(false),
///     sink.clone(),
/// )
/// .unwrap();
///
/// tracked_test!(session, checks_nothing, |_t| {});
/// ```
#[macro_export]
macro_rules! tracked_test {
    ($session:expr, $name:ident, $body:expr) => {
        $session.test(module_path!(), stringify!($name)).run($body)
    };
}
