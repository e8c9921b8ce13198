//! Shutdown coordination
//!
//! Funnels every flush/stop trigger (normal completion, panic-unwind
//! emergency, termination signal) through one `Once`, so the sink sees at
//! most a single flush-then-stop sequence per process no matter how many
//! paths race to it.

use std::sync::{Arc, Once};

use testbeam_sink::TestSink;
use tracing::{debug, info, warn};

/// Cheap handle to the process-wide flush/stop sequence.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    sink: Arc<dyn TestSink>,
    fired: Once,
}

impl ShutdownCoordinator {
    pub fn new(sink: Arc<dyn TestSink>) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                sink,
                fired: Once::new(),
            }),
        }
    }

    /// Flushes and stops the sink, exactly once per process.
    ///
    /// Later calls (and concurrent ones) are no-ops. Sink errors are
    /// logged, never escalated: shutdown runs on paths where failing would
    /// lose more telemetry than it saves.
    pub fn shutdown(&self) {
        self.inner.fired.call_once(|| {
            debug!("flushing test record sink");
            if let Err(e) = self.inner.sink.flush() {
                warn!(error = %e, "failed to flush sink during shutdown");
            }
            if let Err(e) = self.inner.sink.stop() {
                warn!(error = %e, "failed to stop sink during shutdown");
            }
            debug!("test record sink stopped");
        });
    }

    /// Whether the flush/stop sequence has already run.
    pub fn has_fired(&self) -> bool {
        self.inner.fired.is_completed()
    }

    /// Spawns the background termination-signal listener.
    ///
    /// On SIGINT/SIGTERM the listener runs the same flush/stop sequence as
    /// normal completion, then exits the process with code 1. The thread
    /// parks on a minimal current-thread runtime; it never blocks process
    /// exit.
    pub fn spawn_signal_listener(&self) -> std::thread::JoinHandle<()> {
        let coordinator = self.clone();
        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "failed to start signal listener runtime");
                    return;
                }
            };
            runtime.block_on(wait_for_termination());
            info!("termination signal received, stopping test record sink");
            coordinator.shutdown();
            std::process::exit(1);
        })
    }
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "failed to install SIGINT handler");
            return std::future::pending().await;
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to await ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testbeam_sink::RecordingSink;

    #[test]
    fn test_shutdown_runs_flush_then_stop_once() {
        let sink = RecordingSink::new();
        let coordinator = ShutdownCoordinator::new(Arc::new(sink.clone()));

        assert!(!coordinator.has_fired());
        coordinator.shutdown();
        coordinator.shutdown();
        coordinator.shutdown();

        assert!(coordinator.has_fired());
        // stop() itself counts one flush, shutdown adds an explicit one.
        assert_eq!(sink.flush_count(), 2);
        assert_eq!(sink.stop_count(), 1);
    }

    #[test]
    fn test_concurrent_shutdown_fires_once() {
        let sink = RecordingSink::new();
        let coordinator = ShutdownCoordinator::new(Arc::new(sink.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                std::thread::spawn(move || coordinator.shutdown())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.stop_count(), 1);
    }
}
