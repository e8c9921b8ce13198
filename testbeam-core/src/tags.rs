//! Tag vocabulary
//!
//! The fixed set of tag keys attached to tracked tests. Keys are shared
//! between the provider extractors, the normalizer and the lifecycle
//! tracker; values are always strings.

use std::collections::BTreeMap;

/// Tag mapping over the fixed key vocabulary.
///
/// After normalization no key maps to the empty string; absent keys are
/// simply missing.
pub type TagSet = BTreeMap<&'static str, String>;

// CI provider tags
pub const CI_PROVIDER_NAME: &str = "ci.provider.name";
pub const CI_PIPELINE_ID: &str = "ci.pipeline.id";
pub const CI_PIPELINE_NAME: &str = "ci.pipeline.name";
pub const CI_PIPELINE_NUMBER: &str = "ci.pipeline.number";
pub const CI_PIPELINE_URL: &str = "ci.pipeline.url";
pub const CI_JOB_NAME: &str = "ci.job.name";
pub const CI_JOB_URL: &str = "ci.job.url";
pub const CI_STAGE_NAME: &str = "ci.stage.name";
pub const CI_WORKSPACE_PATH: &str = "ci.workspace_path";
/// JSON blob of a curated subset of the provider's raw variables.
pub const CI_ENV_VARS: &str = "ci.env_vars";

// Git provenance tags
pub const GIT_REPOSITORY_URL: &str = "git.repository_url";
pub const GIT_COMMIT_SHA: &str = "git.commit.sha";
pub const GIT_BRANCH: &str = "git.branch";
pub const GIT_TAG: &str = "git.tag";
pub const GIT_COMMIT_MESSAGE: &str = "git.commit.message";
pub const GIT_COMMIT_AUTHOR_NAME: &str = "git.commit.author.name";
pub const GIT_COMMIT_AUTHOR_EMAIL: &str = "git.commit.author.email";
pub const GIT_COMMIT_AUTHOR_DATE: &str = "git.commit.author.date";
pub const GIT_COMMIT_COMMITTER_NAME: &str = "git.commit.committer.name";
pub const GIT_COMMIT_COMMITTER_EMAIL: &str = "git.commit.committer.email";
pub const GIT_COMMIT_COMMITTER_DATE: &str = "git.commit.committer.date";

// Test identity tags
pub const TEST_NAME: &str = "test.name";
pub const TEST_SUITE: &str = "test.suite";
pub const TEST_FRAMEWORK: &str = "test.framework";
pub const TEST_TYPE: &str = "test.type";
pub const TEST_STATUS: &str = "test.status";

// Error tags
pub const ERROR: &str = "error";
pub const ERROR_MSG: &str = "error.msg";
pub const ERROR_TYPE: &str = "error.type";
pub const ERROR_STACK: &str = "error.stack";

/// Marks records produced by this SDK.
pub const ORIGIN: &str = "origin";

/// Service name the session resolved for the run.
pub const SERVICE_NAME: &str = "service.name";

// Tag values with a fixed meaning
pub const TEST_TYPE_TEST: &str = "test";
pub const TEST_TYPE_BENCHMARK: &str = "benchmark";
pub const TEST_STATUS_PASS: &str = "pass";
pub const TEST_STATUS_FAIL: &str = "fail";
pub const TEST_STATUS_SKIP: &str = "skip";
pub const ORIGIN_TEST_RUN: &str = "testbeam";
pub const FRAMEWORK_LIBTEST: &str = "rust/libtest";
