//! In-process job store for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use clippa_models::{Job, JobUpdate};

use crate::error::{DbError, DbResult};
use crate::store::JobStore;

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is.
    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, id: &str, user_id: &str) -> DbResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(id) {
            return Err(DbError::AlreadyExists(id.to_string()));
        }
        jobs.insert(id.to_string(), Job::new(id, user_id));
        Ok(())
    }

    async fn update_job(&self, id: &str, update: &JobUpdate) -> DbResult<()> {
        if let Some(job) = self.jobs.write().await.get_mut(id) {
            job.apply(update);
        }
        Ok(())
    }

    async fn get_job(&self, id: &str) -> DbResult<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn delete_job(&self, id: &str) -> DbResult<()> {
        self.jobs.write().await.remove(id);
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !matches!(job.created_at, Some(created) if created < cutoff));
        Ok((before - jobs.len()) as u64)
    }
}
