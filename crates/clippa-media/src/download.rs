//! Section downloads with yt-dlp.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::pipeline::{AcquireRequest, MediaAcquirer, ProgressFn};
use crate::process::ToolRunner;
use crate::progress::DownloadTracker;

/// Best H.264 video up to 1080p60 with m4a audio, falling back to the best
/// combined H.264 stream under the same height cap.
pub const DEFAULT_FORMAT: &str = "bv[ext=mp4][vcodec^=avc1][height<=?1080][fps<=?60]+ba[ext=m4a]/best[ext=mp4][vcodec^=avc1][height<=?1080]";

/// Request headers sent with every yt-dlp call.
pub(crate) const REQUEST_HEADERS: [&str; 2] = ["referer:youtube.com", "user-agent:Mozilla/5.0"];

pub const DEFAULT_CONCURRENT_FRAGMENTS: u32 = 4;

/// Cookies file to pass to yt-dlp, if configured and present on disk.
pub(crate) async fn usable_cookies(path: Option<&Path>) -> Option<PathBuf> {
    let path = path?;
    match tokio::fs::try_exists(path).await {
        Ok(true) => Some(path.to_path_buf()),
        _ => {
            debug!("Cookies file not found at {}, skipping", path.display());
            None
        }
    }
}

/// [`MediaAcquirer`] backed by the yt-dlp CLI.
#[derive(Debug, Clone)]
pub struct YtDlpAcquirer {
    program: String,
    cookies_path: Option<PathBuf>,
    concurrent_fragments: u32,
}

impl Default for YtDlpAcquirer {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpAcquirer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cookies_path: None,
            concurrent_fragments: DEFAULT_CONCURRENT_FRAGMENTS,
        }
    }

    pub fn with_cookies(mut self, path: Option<PathBuf>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_concurrent_fragments(mut self, fragments: u32) -> Self {
        self.concurrent_fragments = fragments.max(1);
        self
    }

    /// Build the yt-dlp argument list for a section download.
    pub fn build_args(&self, request: &AcquireRequest, cookies: Option<&Path>) -> Vec<String> {
        let format = request.format_id.as_deref().unwrap_or(DEFAULT_FORMAT);

        let mut args = vec![
            "-f".to_string(),
            format.to_string(),
            "--download-sections".to_string(),
            format!("*{}-{}", request.start_time, request.end_time),
            "-o".to_string(),
            request.output_path.to_string_lossy().to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--concurrent-fragments".to_string(),
            self.concurrent_fragments.to_string(),
            "--newline".to_string(),
            "--no-check-certificates".to_string(),
            "--no-warnings".to_string(),
        ];

        for header in REQUEST_HEADERS {
            args.push("--add-header".to_string());
            args.push(header.to_string());
        }

        if request.captions {
            args.extend(
                ["--write-subs", "--write-auto-subs", "--sub-lang", "en", "--sub-format", "vtt"]
                    .map(String::from),
            );
        }

        if let Some(cookies) = cookies {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }

        args.push(request.url.clone());
        args
    }
}

#[async_trait]
impl MediaAcquirer for YtDlpAcquirer {
    async fn acquire(
        &self,
        request: &AcquireRequest,
        cancel: watch::Receiver<bool>,
        progress: ProgressFn,
    ) -> MediaResult<PathBuf> {
        let cookies = usable_cookies(self.cookies_path.as_deref()).await;
        let args = self.build_args(request, cookies.as_deref());

        info!(
            job_id = %request.job_id,
            start = %request.start_time,
            end = %request.end_time,
            format = request.format_id.as_deref().unwrap_or("default"),
            captions = request.captions,
            "Downloading section with yt-dlp"
        );

        let mut tracker = DownloadTracker::new();
        ToolRunner::new(&self.program)
            .with_cancel(cancel)
            .run(&args, |line| {
                if let Some(overall) = tracker.observe(line) {
                    progress(overall);
                }
            })
            .await?;

        if !tokio::fs::try_exists(&request.output_path).await? {
            return Err(MediaError::OutputMissing(request.output_path.clone()));
        }

        Ok(request.output_path.clone())
    }
}
