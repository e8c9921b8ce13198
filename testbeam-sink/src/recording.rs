//! In-memory recording sink
//!
//! Collects span records in a thread-safe buffer and counts flush/stop
//! calls. This is the sink used by the SDK's own tests and anywhere the
//! full record stream should be inspected after a run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::{SinkError, SpanFinish, SpanId, SpanRecord, SpanStart, TestSink};

/// Thread-safe in-memory sink.
///
/// Cloning shares the underlying buffer, so a test can keep a handle while
/// the session owns another.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<RecordingInner>,
}

#[derive(Default)]
struct RecordingInner {
    records: Mutex<Vec<SpanRecord>>,
    flushes: AtomicUsize,
    stops: AtomicUsize,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records seen so far, open ones included.
    pub fn records(&self) -> Vec<SpanRecord> {
        self.inner.records.lock().unwrap().clone()
    }

    /// Records that have been finalized.
    pub fn finished_records(&self) -> Vec<SpanRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.finished_at.is_some())
            .collect()
    }

    /// Number of flush calls observed (stop counts as one flush).
    pub fn flush_count(&self) -> usize {
        self.inner.flushes.load(Ordering::SeqCst)
    }

    /// Number of stop calls observed.
    pub fn stop_count(&self) -> usize {
        self.inner.stops.load(Ordering::SeqCst)
    }
}

impl TestSink for RecordingSink {
    fn open(&self, start: SpanStart) -> SpanId {
        let id = SpanId::new();
        let mut records = self.inner.records.lock().unwrap();
        records.push(SpanRecord::open(id, start));
        id
    }

    fn finish(&self, id: SpanId, finish: SpanFinish) {
        let mut records = self.inner.records.lock().unwrap();
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => record.finalize(finish),
            None => warn!(span_id = %id, "finish for unknown span record"),
        }
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.inner.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), SinkError> {
        self.inner.flushes.fetch_add(1, Ordering::SeqCst);
        self.inner.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_then_finish_completes_record() {
        let sink = RecordingSink::new();
        let id = sink.open(SpanStart::new("suite.case"));
        assert_eq!(sink.finished_records().len(), 0);

        sink.finish(id, SpanFinish::now());
        let finished = sink.finished_records();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].resource, "suite.case");
    }

    #[test]
    fn test_finish_unknown_id_is_ignored() {
        let sink = RecordingSink::new();
        sink.finish(SpanId::new(), SpanFinish::now());
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_flush_and_stop_counters() {
        let sink = RecordingSink::new();
        sink.flush().unwrap();
        sink.stop().unwrap();
        assert_eq!(sink.flush_count(), 2);
        assert_eq!(sink.stop_count(), 1);
    }

    #[test]
    fn test_concurrent_open_finish() {
        let sink = RecordingSink::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    let id = sink.open(SpanStart::new(format!("suite.case_{i}")));
                    sink.finish(id, SpanFinish::now());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.finished_records().len(), 8);
    }
}
