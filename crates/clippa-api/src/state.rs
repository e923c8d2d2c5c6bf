//! Application state.

use std::sync::Arc;

use tracing::warn;

use clippa_db::{JobStore, MemoryJobStore, PostgrestJobStore};
use clippa_media::{
    FfmpegTranscoder, MetadataConfig, MetadataService, TtlCache, YtDlpAcquirer,
    YtDlpMetadataSource,
};
use clippa_storage::{BlobStore, R2Client};
use clippa_worker::{ClipOrchestrator, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: ClipOrchestrator,
    pub jobs: Arc<dyn JobStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub metadata: Arc<MetadataService>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        orchestrator: ClipOrchestrator,
        metadata: Arc<MetadataService>,
    ) -> Self {
        Self {
            config,
            jobs: Arc::clone(orchestrator.jobs()),
            blobs: Arc::clone(orchestrator.blobs()),
            orchestrator,
            metadata,
        }
    }

    /// Build the production wiring from the environment.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let worker = WorkerConfig::from_env();

        let jobs: Arc<dyn JobStore> = if std::env::var("SUPABASE_URL").is_ok() {
            Arc::new(PostgrestJobStore::from_env()?)
        } else {
            warn!("SUPABASE_URL not set, using in-memory job store");
            Arc::new(MemoryJobStore::new())
        };

        let blobs: Arc<dyn BlobStore> = Arc::new(R2Client::from_env().await?);

        let acquirer = YtDlpAcquirer::new(&worker.ytdlp_path)
            .with_cookies(worker.cookies_path.clone())
            .with_concurrent_fragments(worker.concurrent_fragments);
        let transcoder = FfmpegTranscoder::new(&worker.ffmpeg_path);

        let metadata_config = MetadataConfig::from_env();
        let source = YtDlpMetadataSource::new(&worker.ytdlp_path, worker.cookies_path.clone());
        let cache = Arc::new(TtlCache::new(metadata_config.cache_ttl));
        let metadata = Arc::new(MetadataService::new(Arc::new(source), cache, &metadata_config));

        let orchestrator = ClipOrchestrator::new(
            jobs,
            blobs,
            Arc::new(acquirer),
            Arc::new(transcoder),
            worker,
        );

        Ok(Self::new(config, orchestrator, metadata))
    }
}
