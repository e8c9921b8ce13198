//! Tracking session
//!
//! The application-lifetime context object: owns the injected sink, the
//! once-computed CI tag set, the derived service name and the shutdown
//! coordinator. Hosts create one session per test process and open tracked
//! tests through it.

use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use testbeam_core::{EnvSnapshot, TagSet, provenance_tags, tags};
use testbeam_core::normalize::service_from_repository_url;
use testbeam_sink::TestSink;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::classify::FailureSignatures;
use crate::config::SessionConfig;
use crate::lifecycle::{TestKind, TrackedTest};
use crate::shutdown::ShutdownCoordinator;

/// Service name used when neither configuration nor repository URL supply
/// one.
pub const DEFAULT_SERVICE: &str = "testbeam";

/// CI tags are environment-derived and immutable, so one detection pass
/// serves every session in the process.
static PROCESS_CI_TAGS: OnceLock<Arc<TagSet>> = OnceLock::new();

fn process_ci_tags() -> Arc<TagSet> {
    PROCESS_CI_TAGS
        .get_or_init(|| Arc::new(provenance_tags(&EnvSnapshot::from_process())))
        .clone()
}

/// Process-wide tracking context.
pub struct Session {
    sink: Arc<dyn TestSink>,
    coordinator: ShutdownCoordinator,
    signatures: Arc<FailureSignatures>,
    ci_tags: Arc<TagSet>,
    service: String,
    ignored_suite_prefix: Option<String>,
}

impl Session {
    /// Starts a session against the process environment.
    pub fn start(config: SessionConfig, sink: Arc<dyn TestSink>) -> Result<Self> {
        let ci_tags = process_ci_tags();
        Self::build(config, sink, ci_tags)
    }

    /// Runs `body` inside a full session, then flushes and stops the sink.
    ///
    /// The session equivalent of wrapping a test harness main: start,
    /// execute, shut down, in that order, with shutdown guaranteed even
    /// when it already ran through the emergency or signal path.
    pub fn run<F, R>(config: SessionConfig, sink: Arc<dyn TestSink>, body: F) -> Result<R>
    where
        F: FnOnce(&Session) -> R,
    {
        let session = Session::start(config, sink)?;
        let value = body(&session);
        session.shutdown();
        Ok(value)
    }

    /// Starts a session against an explicit snapshot, bypassing the
    /// process-wide cache. Intended for tests and embedded harnesses.
    pub fn start_with_snapshot(
        config: SessionConfig,
        sink: Arc<dyn TestSink>,
        env: &EnvSnapshot,
    ) -> Result<Self> {
        let ci_tags = Arc::new(provenance_tags(env));
        Self::build(config, sink, ci_tags)
    }

    fn build(config: SessionConfig, sink: Arc<dyn TestSink>, ci_tags: Arc<TagSet>) -> Result<Self> {
        config.validate().context("invalid session configuration")?;

        let service = config
            .service
            .clone()
            .or_else(|| {
                ci_tags
                    .get(tags::GIT_REPOSITORY_URL)
                    .map(|url| service_from_repository_url(url))
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_SERVICE.to_string());

        let coordinator = ShutdownCoordinator::new(Arc::clone(&sink));
        if config.signal_listener {
            coordinator.spawn_signal_listener();
        }

        info!(
            service = %service,
            provider = ci_tags.get(tags::CI_PROVIDER_NAME).map(String::as_str).unwrap_or("none"),
            "test tracking session started"
        );

        Ok(Self {
            sink,
            coordinator,
            signatures: Arc::new(config.signatures),
            ci_tags,
            service,
            ignored_suite_prefix: config.ignored_suite_prefix,
        })
    }

    /// Initializes logging the way the test process expects it.
    ///
    /// Safe to call when a subscriber is already installed; the second
    /// registration is dropped.
    pub fn init_tracing() {
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "testbeam=info".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    }

    /// The normalized CI/git tag set shared by every tracked test.
    pub fn ci_tags(&self) -> &TagSet {
        &self.ci_tags
    }

    /// The session's service name (explicit, derived, or default).
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Opens a tracked test.
    pub fn test(&self, suite: &str, name: &str) -> TrackedTest {
        self.open(suite, name, TestKind::Test)
    }

    /// Opens a tracked benchmark.
    pub fn bench(&self, suite: &str, name: &str) -> TrackedTest {
        self.open(suite, name, TestKind::Benchmark)
    }

    fn open(&self, suite: &str, name: &str, kind: TestKind) -> TrackedTest {
        let suite = crate::stack::trim_suite_prefix(suite, self.ignored_suite_prefix.as_deref());
        let mut ci_tags = (*self.ci_tags).clone();
        ci_tags.insert(tags::SERVICE_NAME, self.service.clone());
        TrackedTest::start(
            Arc::clone(&self.sink),
            self.coordinator.clone(),
            Arc::clone(&self.signatures),
            &ci_tags,
            suite,
            name,
            kind,
        )
    }

    /// Runs the normal-completion flush/stop sequence.
    ///
    /// Idempotent, and a no-op when the emergency path or the signal
    /// listener already ran it.
    pub fn shutdown(&self) {
        self.coordinator.shutdown();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.coordinator.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testbeam_sink::RecordingSink;

    fn github_env() -> EnvSnapshot {
        EnvSnapshot::from_pairs([
            ("GITHUB_SHA", "0a1b2c3d"),
            ("GITHUB_REPOSITORY", "acme/widget"),
            ("GITHUB_REF", "refs/heads/main"),
            ("GITHUB_RUN_ID", "1234"),
        ])
    }

    fn quiet_config() -> SessionConfig {
        SessionConfig::new().with_signal_listener(false)
    }

    fn start_session(sink: &RecordingSink) -> Session {
        Session::start_with_snapshot(quiet_config(), Arc::new(sink.clone()), &github_env()).unwrap()
    }

    #[test]
    fn test_service_derived_from_repository_url() {
        let sink = RecordingSink::new();
        let session = start_session(&sink);
        assert_eq!(session.service(), "widget");
    }

    #[test]
    fn test_explicit_service_wins() {
        let sink = RecordingSink::new();
        let session = Session::start_with_snapshot(
            quiet_config().with_service("custom"),
            Arc::new(sink.clone()),
            &github_env(),
        )
        .unwrap();
        assert_eq!(session.service(), "custom");
    }

    #[test]
    fn test_default_service_without_repository() {
        let sink = RecordingSink::new();
        let session = Session::start_with_snapshot(
            quiet_config(),
            Arc::new(sink.clone()),
            &EnvSnapshot::default(),
        )
        .unwrap();
        assert_eq!(session.service(), DEFAULT_SERVICE);
    }

    #[test]
    fn test_tracked_test_carries_ci_and_identity_tags() {
        let sink = RecordingSink::new();
        let session = start_session(&sink);

        session.test("widget::parser", "parses_empty_input").run(|_| {});

        let records = sink.finished_records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.resource, "widget::parser.parses_empty_input");
        assert_eq!(record.tags[tags::CI_PROVIDER_NAME], "github");
        assert_eq!(record.tags[tags::GIT_BRANCH], "main");
        assert_eq!(record.tags[tags::TEST_NAME], "parses_empty_input");
        assert_eq!(record.tags[tags::TEST_SUITE], "widget::parser");
        assert_eq!(record.tags[tags::TEST_TYPE], "test");
        assert_eq!(record.tags[tags::TEST_STATUS], "pass");
        assert_eq!(record.tags[tags::SERVICE_NAME], "widget");
    }

    #[test]
    fn test_suite_prefix_trimmed() {
        let sink = RecordingSink::new();
        let session = Session::start_with_snapshot(
            quiet_config().with_ignored_suite_prefix("widget"),
            Arc::new(sink.clone()),
            &github_env(),
        )
        .unwrap();

        session.test("widget::parser", "case").run(|_| {});

        let records = sink.finished_records();
        assert_eq!(records[0].tags[tags::TEST_SUITE], "parser");
        assert_eq!(records[0].resource, "parser.case");
    }

    #[test]
    fn test_benchmark_kind_tag() {
        let sink = RecordingSink::new();
        let session = start_session(&sink);
        session.bench("widget::perf", "throughput").run(|_| {});
        let records = sink.finished_records();
        assert_eq!(records[0].tags[tags::TEST_TYPE], "benchmark");
    }

    #[test]
    fn test_run_wraps_start_and_shutdown() {
        let sink = RecordingSink::new();
        let value = Session::run(quiet_config(), Arc::new(sink.clone()), |session| {
            session.test("suite", "case").run(|_| {});
            7
        })
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(sink.stop_count(), 1);
        assert_eq!(sink.finished_records().len(), 1);
    }

    #[test]
    fn test_shutdown_idempotent_across_session_drop() {
        let sink = RecordingSink::new();
        let session = start_session(&sink);
        session.shutdown();
        session.shutdown();
        drop(session);
        assert_eq!(sink.stop_count(), 1);
    }
}
