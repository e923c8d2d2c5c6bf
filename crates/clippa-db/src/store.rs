//! Job Store interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use clippa_models::{Job, JobUpdate};

use crate::error::DbResult;

/// Persistent job records.
///
/// Updating or deleting a missing job is a no-op rather than an error.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new `processing` record.
    async fn create_job(&self, id: &str, user_id: &str) -> DbResult<()>;

    /// Write only the fields present in `update`.
    async fn update_job(&self, id: &str, update: &JobUpdate) -> DbResult<()>;

    async fn get_job(&self, id: &str) -> DbResult<Option<Job>>;

    async fn delete_job(&self, id: &str) -> DbResult<()>;

    /// Delete jobs created before `cutoff`, returning how many were removed.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> DbResult<u64>;
}
