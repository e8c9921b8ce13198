//! Session configuration
//!
//! Defines the configurable parameters for a tracking session: service
//! naming, suite prefix trimming, failure-classification signatures and the
//! termination-signal listener toggle.

use testbeam_core::EnvSnapshot;

use crate::classify::FailureSignatures;

/// Session configuration
///
/// Everything here has a sensible default; `from_env` overlays the
/// `TESTBEAM_*` variables so CI jobs can tune behavior without code
/// changes.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Explicit service name. When absent, the session derives one from
    /// the repository URL tag, falling back to a fixed default.
    pub service: Option<String>,

    /// Prefix trimmed from suite names (usually the crate root module).
    pub ignored_suite_prefix: Option<String>,

    /// Stack-text signatures for the fallback failure classifier.
    pub signatures: FailureSignatures,

    /// Whether to spawn the background termination-signal listener.
    pub signal_listener: bool,
}

impl SessionConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self {
            service: None,
            ignored_suite_prefix: None,
            signatures: FailureSignatures::default(),
            signal_listener: true,
        }
    }

    /// Creates configuration from the process environment.
    ///
    /// Read variables:
    /// - TESTBEAM_SERVICE (optional service name)
    /// - TESTBEAM_SUITE_PREFIX (optional suite prefix to trim)
    /// - TESTBEAM_NO_SIGNAL_LISTENER (any non-empty value disables the
    ///   listener)
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::from_process())
    }

    /// Creates configuration from an explicit snapshot.
    pub fn from_snapshot(env: &EnvSnapshot) -> Self {
        let mut config = Self::new();
        let service = env.get("TESTBEAM_SERVICE");
        if !service.is_empty() {
            config.service = Some(service.to_string());
        }
        let prefix = env.get("TESTBEAM_SUITE_PREFIX");
        if !prefix.is_empty() {
            config.ignored_suite_prefix = Some(prefix.to_string());
        }
        if !env.get("TESTBEAM_NO_SIGNAL_LISTENER").is_empty() {
            config.signal_listener = false;
        }
        config
    }

    /// Sets an explicit service name.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the suite prefix to trim from fully qualified names.
    pub fn with_ignored_suite_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_suite_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables the termination-signal listener.
    pub fn with_signal_listener(mut self, enabled: bool) -> Self {
        self.signal_listener = enabled;
        self
    }

    /// Replaces the fallback classification signatures.
    pub fn with_signatures(mut self, signatures: FailureSignatures) -> Self {
        self.signatures = signatures;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(service) = &self.service {
            if service.is_empty() {
                anyhow::bail!("service name cannot be empty when set");
            }
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}
