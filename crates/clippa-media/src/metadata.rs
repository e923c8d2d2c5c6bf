//! Remote media metadata lookups.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use clippa_models::{FormatOption, VideoInfo, VideoSummary};

use crate::cache::{TtlCache, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL, MIN_SWEEP_INTERVAL};
use crate::download::{usable_cookies, REQUEST_HEADERS};
use crate::error::MediaResult;
use crate::formats::{resolve_formats, DEFAULT_MAX_PIXELS};
use crate::process::ToolRunner;

/// Source of video metadata. No retries are applied on top of it.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, url: &str) -> MediaResult<VideoInfo>;
}

/// [`MetadataSource`] that runs `yt-dlp -j`.
#[derive(Debug, Clone)]
pub struct YtDlpMetadataSource {
    program: String,
    cookies_path: Option<PathBuf>,
}

impl YtDlpMetadataSource {
    pub fn new(program: impl Into<String>, cookies_path: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cookies_path,
        }
    }

    pub fn build_args(url: &str, cookies: Option<&std::path::Path>) -> Vec<String> {
        let mut args = vec![
            "-j".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificates".to_string(),
        ];
        for header in REQUEST_HEADERS {
            args.push("--add-header".to_string());
            args.push(header.to_string());
        }
        if let Some(cookies) = cookies {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MetadataSource for YtDlpMetadataSource {
    async fn fetch(&self, url: &str) -> MediaResult<VideoInfo> {
        let cookies = usable_cookies(self.cookies_path.as_deref()).await;
        let args = Self::build_args(url, cookies.as_deref());

        let output = ToolRunner::new(&self.program)
            .capture_stdout()
            .run(&args, |_| {})
            .await?;

        Ok(serde_json::from_str(output.stdout.trim())?)
    }
}

/// Cache key for a video URL: `metadata:<video id>`.
///
/// Uses the `v` query parameter, else the last path segment, else the raw URL.
pub fn metadata_cache_key(url: &str) -> String {
    let id = Url::parse(url).ok().and_then(|parsed| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
            .or_else(|| {
                parsed
                    .path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
                    .filter(|s| !s.is_empty())
            })
    });
    format!("metadata:{}", id.as_deref().unwrap_or(url))
}

/// Metadata cache settings.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub cache_ttl: Duration,
    pub sweep_interval: Duration,
    /// Pixel ceiling for offered formats.
    pub max_pixels: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl MetadataConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl: std::env::var("METADATA_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            sweep_interval: std::env::var("METADATA_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval)
                .max(MIN_SWEEP_INTERVAL),
            max_pixels: defaults.max_pixels,
        }
    }
}

/// Cached metadata lookups shared by all requests.
pub struct MetadataService {
    source: Arc<dyn MetadataSource>,
    cache: Arc<TtlCache<VideoInfo>>,
    max_pixels: u64,
}

impl MetadataService {
    pub fn new(
        source: Arc<dyn MetadataSource>,
        cache: Arc<TtlCache<VideoInfo>>,
        config: &MetadataConfig,
    ) -> Self {
        Self {
            source,
            cache,
            max_pixels: config.max_pixels,
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache<VideoInfo>> {
        &self.cache
    }

    /// Metadata for `url`, served from cache when fresh.
    pub async fn metadata(&self, url: &str) -> MediaResult<VideoInfo> {
        let key = metadata_cache_key(url);
        if let Some(info) = self.cache.get(&key).await {
            debug!(key = %key, "Metadata cache hit");
            return Ok(info);
        }

        info!(url = %url, "Fetching video metadata");
        let info = self.source.fetch(url).await?;
        if info.formats.is_some() {
            self.cache.set(key, info.clone()).await;
        }
        Ok(info)
    }

    pub async fn formats(&self, url: &str) -> MediaResult<Vec<FormatOption>> {
        let info = self.metadata(url).await?;
        Ok(resolve_formats(
            info.formats.as_deref().unwrap_or_default(),
            self.max_pixels,
        ))
    }

    pub async fn info(&self, url: &str) -> MediaResult<VideoSummary> {
        Ok(self.metadata(url).await?.summary())
    }
}
