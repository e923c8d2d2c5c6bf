//! Stage interfaces used by the job orchestrator.
//!
//! The orchestrator only sees these traits, so tests can swap the real
//! yt-dlp/FFmpeg implementations for fakes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::MediaResult;

/// Overall-progress callback (0..=100). Called from the output read loop.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Parameters for fetching a time-bounded section of remote media.
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub job_id: String,
    pub url: String,
    pub start_time: String,
    pub end_time: String,
    /// Explicit format expression; `None` uses the default preference.
    pub format_id: Option<String>,
    pub captions: bool,
    pub output_path: PathBuf,
}

#[async_trait]
pub trait MediaAcquirer: Send + Sync {
    /// Download the section and return the local media path.
    async fn acquire(
        &self,
        request: &AcquireRequest,
        cancel: watch::Receiver<bool>,
        progress: ProgressFn,
    ) -> MediaResult<PathBuf>;
}

/// Parameters for the remux/re-encode stage.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub job_id: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub burn_captions: bool,
    pub captions_path: Option<PathBuf>,
    /// Clip length in seconds, used to normalise encode progress.
    pub duration_secs: f64,
}

#[async_trait]
pub trait MediaTranscoder: Send + Sync {
    /// Produce `output_path` and return it.
    async fn transcode(
        &self,
        request: &TranscodeRequest,
        cancel: watch::Receiver<bool>,
        progress: ProgressFn,
    ) -> MediaResult<PathBuf>;
}

/// Sibling caption path the downloader writes for `media_path`
/// (`clip-x.mp4` -> `clip-x.en.vtt`).
pub fn captions_path_for(media_path: &Path) -> PathBuf {
    media_path.with_extension("en.vtt")
}
