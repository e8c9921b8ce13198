//! Test lifecycle tracking
//!
//! One `TrackedTest` per test execution: opened with identity tags plus the
//! shared CI tag set, finalized exactly once with the classified outcome.
//! The `run` wrapper owns the finish step for every way control can leave
//! the body: normal return, abrupt-failure signal, or an unrecovered panic
//! (which is annotated, flushed and re-raised unchanged).

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use testbeam_core::{TagSet, tags};
use testbeam_sink::{SpanFinish, SpanId, SpanStart, TestSink};
use tracing::debug;

use crate::classify::{AbruptFailure, FailureSignatures, Outcome, refine_failure};
use crate::shutdown::ShutdownCoordinator;
use crate::stack::{capture_stack, panic_message};

/// Kind of tracked unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    Test,
    Benchmark,
}

impl TestKind {
    fn tag_value(&self) -> &'static str {
        match self {
            TestKind::Test => tags::TEST_TYPE_TEST,
            TestKind::Benchmark => tags::TEST_TYPE_BENCHMARK,
        }
    }
}

#[derive(Default)]
struct UnitState {
    failed: bool,
    skipped: bool,
    message: Option<String>,
    abrupt: bool,
    fatal: bool,
    finished: bool,
}

/// How control left the test body, as seen by the finalizer.
enum FinishReason {
    /// Body returned (or the record is being dropped outside a panic).
    Completed,
    /// The typed abrupt-failure payload unwound out of the body.
    Abrupt(AbruptFailure),
    /// A foreign panic unwound out of the body.
    Panicked { message: String, stack: String },
}

/// A single test execution being tracked.
///
/// Created by [`crate::Session::test`] / [`crate::Session::bench`].
/// Finalizes exactly once: through [`TrackedTest::run`], or from the drop
/// guard when a record goes out of scope unfinished.
pub struct TrackedTest {
    sink: Arc<dyn TestSink>,
    coordinator: ShutdownCoordinator,
    signatures: Arc<FailureSignatures>,
    span_id: SpanId,
    fqn: String,
    started_at: DateTime<Utc>,
    state: Mutex<UnitState>,
}

impl TrackedTest {
    pub(crate) fn start(
        sink: Arc<dyn TestSink>,
        coordinator: ShutdownCoordinator,
        signatures: Arc<FailureSignatures>,
        ci_tags: &TagSet,
        suite: &str,
        name: &str,
        kind: TestKind,
    ) -> Self {
        let fqn = format!("{suite}.{name}");

        let mut initial = ci_tags.clone();
        initial.insert(tags::TEST_NAME, name.to_string());
        initial.insert(tags::TEST_SUITE, suite.to_string());
        initial.insert(tags::TEST_FRAMEWORK, tags::FRAMEWORK_LIBTEST.to_string());
        initial.insert(tags::TEST_TYPE, kind.tag_value().to_string());
        initial.insert(tags::ORIGIN, tags::ORIGIN_TEST_RUN.to_string());

        let span_id = sink.open(SpanStart::new(fqn.clone()).with_tags(initial));
        debug!(span_id = %span_id, test = %fqn, "tracked test opened");

        Self {
            sink,
            coordinator,
            signatures,
            span_id,
            fqn,
            started_at: Utc::now(),
            state: Mutex::new(UnitState::default()),
        }
    }

    /// Fully qualified name (`suite.test_name`).
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    /// Flags the unit failed and keeps executing (fail-but-continue).
    ///
    /// The first message wins when called repeatedly.
    pub fn fail(&self, message: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.failed = true;
        if state.message.is_none() {
            state.message = Some(message.into());
        }
    }

    /// Flags the unit failed and halts the body immediately.
    ///
    /// Must be called inside a [`TrackedTest::run`] body; the raised signal
    /// is consumed there and classified as an abrupt failure.
    pub fn fail_now(&self) -> ! {
        {
            let mut state = self.state.lock().unwrap();
            state.failed = true;
            state.abrupt = true;
        }
        std::panic::panic_any(AbruptFailure {
            message: None,
            stack: capture_stack(),
        })
    }

    /// Abrupt failure carrying an explicit message (the fatal variant).
    pub fn fatal(&self, message: impl Into<String>) -> ! {
        let message = message.into();
        {
            let mut state = self.state.lock().unwrap();
            state.failed = true;
            state.abrupt = true;
            state.fatal = true;
            if state.message.is_none() {
                state.message = Some(message.clone());
            }
        }
        std::panic::panic_any(AbruptFailure {
            message: Some(message),
            stack: capture_stack(),
        })
    }

    /// Flags the unit skipped.
    pub fn skip(&self) {
        self.state.lock().unwrap().skipped = true;
    }

    /// Executes the test body and finalizes the record.
    ///
    /// Returns the body's value, or None when an abrupt failure cut it
    /// short. A foreign panic is recorded, the sink is emergency-flushed,
    /// and the original payload resumes unwinding.
    pub fn run<F, R>(self, body: F) -> Option<R>
    where
        F: FnOnce(&Self) -> R,
    {
        let result = catch_unwind(AssertUnwindSafe(|| body(&self)));
        match result {
            Ok(value) => {
                self.finish_with(FinishReason::Completed);
                Some(value)
            }
            Err(payload) => match payload.downcast::<AbruptFailure>() {
                Ok(abrupt) => {
                    self.finish_with(FinishReason::Abrupt(*abrupt));
                    None
                }
                Err(payload) => {
                    self.finish_with(FinishReason::Panicked {
                        message: panic_message(payload.as_ref()),
                        stack: capture_stack(),
                    });
                    // Telemetry first: the process may die with the panic.
                    self.coordinator.shutdown();
                    resume_unwind(payload)
                }
            },
        }
    }

    /// Finalizes the record. First caller wins; later calls are no-ops.
    fn finish_with(&self, reason: FinishReason) {
        let mut state = self.state.lock().unwrap();
        if state.finished {
            return;
        }
        state.finished = true;

        let mut out = TagSet::new();
        let outcome = match reason {
            FinishReason::Completed => {
                if state.failed {
                    let stack = capture_stack();
                    let outcome = refine_failure(&stack, &self.signatures);
                    if let Some(message) = &state.message {
                        out.insert(tags::ERROR_MSG, message.clone());
                    }
                    out.insert(tags::ERROR_STACK, stack);
                    outcome
                } else if state.skipped {
                    Outcome::Skipped
                } else {
                    Outcome::Passed
                }
            }
            FinishReason::Abrupt(abrupt) => {
                let outcome = if abrupt.message.is_some() {
                    Outcome::FailedFatal
                } else {
                    Outcome::FailedAbrupt
                };
                if let Some(message) = abrupt.message.or_else(|| state.message.clone()) {
                    out.insert(tags::ERROR_MSG, message);
                }
                out.insert(tags::ERROR_STACK, abrupt.stack);
                outcome
            }
            FinishReason::Panicked { message, stack } => {
                out.insert(tags::ERROR_MSG, message);
                out.insert(tags::ERROR_STACK, stack);
                Outcome::FailedPanic
            }
        };

        out.insert(tags::TEST_STATUS, outcome.status().to_string());
        out.insert(tags::ERROR, outcome.is_failure().to_string());
        if let Some(error_type) = outcome.error_type() {
            out.insert(tags::ERROR_TYPE, error_type.to_string());
        }

        let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds();
        debug!(
            test = %self.fqn,
            status = outcome.status(),
            elapsed_ms,
            "tracked test finished"
        );
        self.sink.finish(self.span_id, SpanFinish::now().with_tags(out));
    }
}

impl Drop for TrackedTest {
    /// Safety net for records not driven through [`TrackedTest::run`]: the
    /// unit still finalizes exactly once, from its flags. During a panic
    /// unwind the record is classified from the raised signal (abrupt when
    /// `fail_now`/`fatal` raised it, panic otherwise) and the emergency
    /// flush runs before unwinding continues.
    fn drop(&mut self) {
        let finished = self.state.lock().unwrap().finished;
        if finished {
            return;
        }
        if std::thread::panicking() {
            let (abrupt, fatal, message) = {
                let state = self.state.lock().unwrap();
                (state.abrupt, state.fatal, state.message.clone())
            };
            if abrupt {
                self.finish_with(FinishReason::Abrupt(AbruptFailure {
                    message: if fatal { message } else { None },
                    stack: capture_stack(),
                }));
            } else {
                self.finish_with(FinishReason::Panicked {
                    message: "test panicked before finalization".to_string(),
                    stack: capture_stack(),
                });
                self.coordinator.shutdown();
            }
        } else {
            self.finish_with(FinishReason::Completed);
        }
    }
}
