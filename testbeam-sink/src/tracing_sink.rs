//! Tracing-backed sink
//!
//! Forwards span open/finish events to the `tracing` ecosystem. Useful when
//! the host application already ships a subscriber and wants test records in
//! the same stream.

use testbeam_core::tags;
use tracing::{debug, info};

use crate::{SinkError, SpanFinish, SpanId, SpanStart, TestSink};

/// Stateless sink emitting `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl TestSink for TracingSink {
    fn open(&self, start: SpanStart) -> SpanId {
        let id = SpanId::new();
        info!(
            span_id = %id,
            resource = %start.resource,
            tags = start.tags.len(),
            "test span opened"
        );
        id
    }

    fn finish(&self, id: SpanId, finish: SpanFinish) {
        let status = finish
            .tags
            .get(tags::TEST_STATUS)
            .map(String::as_str)
            .unwrap_or("unknown");
        info!(span_id = %id, status, "test span finished");
    }

    fn flush(&self) -> Result<(), SinkError> {
        debug!("tracing sink flushed");
        Ok(())
    }

    fn stop(&self) -> Result<(), SinkError> {
        debug!("tracing sink stopped");
        Ok(())
    }
}
