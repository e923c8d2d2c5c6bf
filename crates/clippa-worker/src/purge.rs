//! Periodic removal of old job records.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use clippa_db::{DbResult, JobStore};

use crate::metrics;

/// Shortest purge interval the task accepts.
pub const MIN_PURGE_INTERVAL: Duration = Duration::from_secs(1);

/// Delete jobs created more than `retention` ago.
pub async fn purge_once(jobs: &dyn JobStore, retention: Duration) -> DbResult<u64> {
    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(retention)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
    let purged = jobs.purge_older_than(cutoff).await?;
    metrics::record_purged(purged);
    Ok(purged)
}

/// Purge immediately, then every `interval` until `shutdown` flips to true.
/// Intervals below [`MIN_PURGE_INTERVAL`] are raised to it.
pub fn spawn_purge_task(
    jobs: Arc<dyn JobStore>,
    retention: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let interval = interval.max(MIN_PURGE_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match purge_once(jobs.as_ref(), retention).await {
                        Ok(0) => {}
                        Ok(purged) => info!(purged, "Purged expired jobs"),
                        Err(e) => warn!(error = %e, "Job purge failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Purge task stopping");
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clippa_db::MemoryJobStore;
    use clippa_models::Job;

    fn job_aged(id: &str, age: chrono::Duration) -> Job {
        let mut job = Job::new(id, "user");
        job.created_at = Some(Utc::now() - age);
        job
    }

    #[tokio::test]
    async fn test_purge_once_removes_only_expired() {
        let store = MemoryJobStore::new();
        store.insert(job_aged("old", chrono::Duration::hours(30))).await;
        store.insert(job_aged("new", chrono::Duration::hours(1))).await;

        let purged = purge_once(&store, Duration::from_secs(24 * 3600)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.get_job("old").await.unwrap().is_none());
        assert!(store.get_job("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_task_runs_immediately_and_stops() {
        let store = Arc::new(MemoryJobStore::new());
        store.insert(job_aged("old", chrono::Duration::hours(48))).await;

        let (tx, rx) = watch::channel(false);
        let handle = spawn_purge_task(
            store.clone(),
            Duration::from_secs(24 * 3600),
            Duration::from_secs(3600),
            rx,
        );

        for _ in 0..50 {
            if store.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.is_empty().await);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_task_survives_zero_interval() {
        let store = Arc::new(MemoryJobStore::new());
        store.insert(job_aged("old", chrono::Duration::hours(48))).await;

        let (tx, rx) = watch::channel(false);
        let handle = spawn_purge_task(
            store.clone(),
            Duration::from_secs(24 * 3600),
            Duration::ZERO,
            rx,
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(store.is_empty().await);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
