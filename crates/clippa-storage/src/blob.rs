//! Blob Store interface.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::error::StorageResult;

/// Content type for finished clips.
pub const CLIP_CONTENT_TYPE: &str = "video/mp4";

/// Storage key for a job's clip.
pub fn clip_key(job_id: &str) -> String {
    format!("clip-{}.mp4", job_id)
}

/// Durable object storage for finished clips.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream a local file to `key` and return its public URL.
    async fn upload_file(&self, path: &Path, key: &str, content_type: &str)
        -> StorageResult<String>;

    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Time-limited download URL that saves as `download_filename`.
    async fn signed_url(
        &self,
        key: &str,
        download_filename: &str,
        ttl: Duration,
    ) -> StorageResult<String>;
}
