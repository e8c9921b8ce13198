//! Testbeam Sink
//!
//! The span-like transport abstraction the lifecycle tracker writes to.
//!
//! The tracker performs exactly two calls per test unit: `open` with initial
//! tags and `finish` with outcome tags, plus one process-level
//! `flush`/`stop` pair at shutdown. Everything past that boundary (batching,
//! export, networking) belongs to the sink implementation.
//!
//! # Example
//!
//! ```
//! use testbeam_sink::{RecordingSink, SpanFinish, SpanStart, TestSink};
//!
//! let sink = RecordingSink::new();
//! let id = sink.open(SpanStart::new("suite.case_one"));
//! sink.finish(id, SpanFinish::now());
//! assert_eq!(sink.records().len(), 1);
//! ```

pub mod error;
mod jsonl;
mod recording;
mod tracing_sink;

pub use error::SinkError;
pub use jsonl::JsonLinesSink;
pub use recording::RecordingSink;
pub use tracing_sink::TracingSink;

use chrono::{DateTime, Utc};
use serde::Serialize;
use testbeam_core::TagSet;
use uuid::Uuid;

/// Opaque handle to an open span record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SpanId(Uuid);

impl SpanId {
    /// Allocates a fresh handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SpanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Initial metadata for an opened span.
#[derive(Debug, Clone, Serialize)]
pub struct SpanStart {
    /// Fully qualified resource name (`suite.test_name`).
    pub resource: String,
    pub started_at: DateTime<Utc>,
    /// Identity tags plus the shared CI/git tag set.
    pub tags: TagSet,
}

impl SpanStart {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            started_at: Utc::now(),
            tags: TagSet::new(),
        }
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags.extend(tags);
        self
    }
}

/// Outcome metadata attached when a span is finalized.
#[derive(Debug, Clone, Serialize)]
pub struct SpanFinish {
    pub finished_at: DateTime<Utc>,
    /// Status and error tags.
    pub tags: TagSet,
}

impl SpanFinish {
    pub fn now() -> Self {
        Self {
            finished_at: Utc::now(),
            tags: TagSet::new(),
        }
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags.extend(tags);
        self
    }
}

/// A completed (or still open) span as a sink sees it.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub id: SpanId,
    pub resource: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub tags: TagSet,
}

impl SpanRecord {
    fn open(id: SpanId, start: SpanStart) -> Self {
        Self {
            id,
            resource: start.resource,
            started_at: start.started_at,
            finished_at: None,
            tags: start.tags,
        }
    }

    fn finalize(&mut self, finish: SpanFinish) {
        self.finished_at = Some(finish.finished_at);
        self.tags.extend(finish.tags);
    }
}

/// Sink for tracked test spans.
///
/// Implementations must tolerate concurrent `open`/`finish` calls from
/// parallel test threads. `finish` is called at most once per id; an
/// unknown id is logged and ignored, never fatal. `stop` implies a final
/// flush and is safe to call more than once.
pub trait TestSink: Send + Sync {
    /// Opens a record with initial tags, returning its handle.
    fn open(&self, start: SpanStart) -> SpanId;

    /// Finalizes a record with outcome tags.
    fn finish(&self, id: SpanId, finish: SpanFinish);

    /// Pushes buffered records to the underlying target.
    fn flush(&self) -> Result<(), SinkError>;

    /// Flushes and closes the sink. Idempotent.
    fn stop(&self) -> Result<(), SinkError>;
}
