//! Ordered progress persistence.
//!
//! Progress callbacks fire from tool output loops and must not block on the
//! job store. Each job gets one writer task that drains a queue and persists
//! the highest value seen, so writes land in order and never go backwards.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use clippa_db::JobStore;
use clippa_media::ProgressFn;
use clippa_models::JobUpdate;

struct Inner {
    tx: Mutex<Option<mpsc::UnboundedSender<u8>>>,
    high_water: AtomicU8,
}

impl Inner {
    fn report(&self, progress: u8) {
        let progress = progress.min(100);
        let previous = self.high_water.fetch_max(progress, Ordering::AcqRel);
        if progress <= previous {
            return;
        }
        if let Ok(guard) = self.tx.lock() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(progress);
            }
        }
    }
}

/// Per-job progress writer.
pub struct ProgressReporter {
    inner: Arc<Inner>,
    writer: JoinHandle<()>,
}

impl ProgressReporter {
    /// Start the writer task for `job_id`.
    pub fn spawn(jobs: Arc<dyn JobStore>, job_id: impl Into<String>) -> Self {
        let job_id = job_id.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<u8>();

        let writer = tokio::spawn(async move {
            while let Some(mut progress) = rx.recv().await {
                // Coalesce whatever queued up while the last write was in flight
                while let Ok(next) = rx.try_recv() {
                    progress = progress.max(next);
                }
                debug!(job_id = %job_id, progress, "Persisting progress");
                if let Err(e) = jobs.update_job(&job_id, &JobUpdate::progress(progress)).await {
                    warn!(job_id = %job_id, progress, error = %e, "Failed to persist progress");
                }
            }
        });

        Self {
            inner: Arc::new(Inner {
                tx: Mutex::new(Some(tx)),
                high_water: AtomicU8::new(0),
            }),
            writer,
        }
    }

    /// Queue a progress value. Values at or below the high-water mark are dropped.
    pub fn report(&self, progress: u8) {
        self.inner.report(progress);
    }

    /// Callback handed to the media stages.
    pub fn callback(&self) -> ProgressFn {
        let inner = Arc::clone(&self.inner);
        Arc::new(move |progress| inner.report(progress))
    }

    /// Highest value reported so far.
    pub fn current(&self) -> u8 {
        self.inner.high_water.load(Ordering::Acquire)
    }

    /// Stop accepting values and wait for queued writes to land.
    ///
    /// Callbacks that outlive the reporter become no-ops.
    pub async fn finish(self) {
        if let Ok(mut guard) = self.inner.tx.lock() {
            guard.take();
        }
        if let Err(e) = self.writer.await {
            warn!(error = %e, "Progress writer task failed");
        }
    }
}
