//! JSON-lines sink
//!
//! Writes one JSON object per finalized span to any `Write` target through
//! a buffered writer. Records are emitted on finish; open spans stay
//! pending until then. Write failures are kept and surfaced on the next
//! flush instead of disturbing the test lifecycle.

use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::sync::Mutex;

use tracing::warn;

use crate::{SinkError, SpanFinish, SpanId, SpanRecord, SpanStart, TestSink};

/// Sink serializing finalized records as JSON lines.
pub struct JsonLinesSink<W: Write + Send> {
    inner: Mutex<JsonLinesInner<W>>,
}

struct JsonLinesInner<W: Write + Send> {
    writer: BufWriter<W>,
    pending: HashMap<SpanId, SpanRecord>,
    deferred_error: Option<SinkError>,
    closed: bool,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Creates a sink writing to the given target.
    pub fn new(target: W) -> Self {
        Self {
            inner: Mutex::new(JsonLinesInner {
                writer: BufWriter::new(target),
                pending: HashMap::new(),
                deferred_error: None,
                closed: false,
            }),
        }
    }
}

impl<W: Write + Send> JsonLinesInner<W> {
    fn write_record(&mut self, record: &SpanRecord) {
        let result = serde_json::to_string(record)
            .map_err(SinkError::from)
            .and_then(|line| {
                self.writer
                    .write_all(line.as_bytes())
                    .and_then(|()| self.writer.write_all(b"\n"))
                    .map_err(SinkError::from)
            });
        if let Err(e) = result {
            warn!(span_id = %record.id, error = %e, "failed to write span record");
            if self.deferred_error.is_none() {
                self.deferred_error = Some(e);
            }
        }
    }
}

impl<W: Write + Send> TestSink for JsonLinesSink<W> {
    fn open(&self, start: SpanStart) -> SpanId {
        let id = SpanId::new();
        let mut inner = self.inner.lock().unwrap();
        inner.pending.insert(id, SpanRecord::open(id, start));
        id
    }

    fn finish(&self, id: SpanId, finish: SpanFinish) {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            warn!(span_id = %id, "finish after sink stop, record dropped");
            return;
        }
        match inner.pending.remove(&id) {
            Some(mut record) => {
                record.finalize(finish);
                inner.write_record(&record);
            }
            None => warn!(span_id = %id, "finish for unknown span record"),
        }
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(e) = inner.deferred_error.take() {
            return Err(e);
        }
        inner.writer.flush().map_err(SinkError::from)
    }

    fn stop(&self) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;
        if let Some(e) = inner.deferred_error.take() {
            return Err(e);
        }
        inner.writer.flush().map_err(SinkError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Shared byte buffer usable as a write target from inside the sink.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_one_json_line_per_record() {
        let buf = SharedBuf::default();
        let sink = JsonLinesSink::new(buf.clone());

        let id = sink.open(SpanStart::new("suite.first"));
        sink.finish(id, SpanFinish::now());
        let id = sink.open(SpanStart::new("suite.second"));
        sink.finish(id, SpanFinish::now());
        sink.flush().unwrap();

        let bytes = buf.0.lock().unwrap().clone();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value["resource"].as_str().unwrap().starts_with("suite."));
            assert!(value["finished_at"].is_string());
        }
    }

    #[test]
    fn test_stop_is_idempotent() {
        let sink = JsonLinesSink::new(SharedBuf::default());
        sink.stop().unwrap();
        sink.stop().unwrap();
    }

    #[test]
    fn test_finish_after_stop_drops_record() {
        let buf = SharedBuf::default();
        let sink = JsonLinesSink::new(buf.clone());
        let id = sink.open(SpanStart::new("suite.case"));
        sink.stop().unwrap();
        sink.finish(id, SpanFinish::now());
        assert!(buf.0.lock().unwrap().is_empty());
    }
}
