//! # Background Tasks
//!
//! Fire-and-forget jobs that run after a request has already been answered.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request handler                                                        │
//! │       │  tx.commit()                                                    │
//! │       │  tasks.spawn("product_stats", recompute(...))  ── not awaited   │
//! │       ▼                                                                 │
//! │  201 Created                      tokio worker                          │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                                  Ok  → debug!                           │
//! │                                  Err → error! (request unaffected)      │
//! │                                                                         │
//! │  shutdown: tasks.drain().await waits for whatever is still running      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Handle for spawning best-effort background jobs.
///
/// Cheap to clone; clones share the same set of in-flight jobs.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `job` on the runtime. Its error is logged and dropped.
    pub fn spawn<F, E>(&self, name: &'static str, job: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            match job.await {
                Ok(()) => debug!(task = name, "Background task finished"),
                Err(e) => error!(task = name, error = %e, "Background task failed"),
            }
        });

        match self.in_flight.lock() {
            Ok(mut in_flight) => {
                in_flight.retain(|h| !h.is_finished());
                in_flight.push(handle);
            }
            // A poisoned list only loses the ability to drain; the job runs.
            Err(_) => warn!(task = name, "Background task list poisoned"),
        }
    }

    /// Number of jobs that have not finished yet.
    pub fn pending(&self) -> usize {
        self.in_flight
            .lock()
            .map(|in_flight| in_flight.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    /// Waits for every job spawned so far.
    pub async fn drain(&self) {
        let handles = match self.in_flight.lock() {
            Ok(mut in_flight) => std::mem::take(&mut *in_flight),
            Err(_) => return,
        };

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Background task panicked");
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_drain_waits_for_jobs() {
        let tasks = BackgroundTasks::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = counter.clone();
            tasks.spawn("count", async move {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            });
        }

        tasks.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_failed_job_is_swallowed() {
        let tasks = BackgroundTasks::new();
        tasks.spawn("fails", async { Err::<(), _>("boom") });
        tasks.drain().await;
        assert_eq!(tasks.pending(), 0);
    }
}
