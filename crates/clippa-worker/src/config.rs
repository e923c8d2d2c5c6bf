//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory for intermediate and final clip files
    pub work_dir: PathBuf,
    /// Wall-clock limit for one job
    pub job_timeout: Duration,
    /// Parallel fragment downloads per job
    pub concurrent_fragments: u32,
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
    /// Netscape cookies file for yt-dlp, used when present
    pub cookies_path: Option<PathBuf>,
    /// Jobs older than this are purged
    pub job_retention: Duration,
    pub purge_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("uploads"),
            job_timeout: Duration::from_secs(600),
            concurrent_fragments: 4,
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            cookies_path: None,
            job_retention: Duration::from_secs(24 * 3600),
            purge_interval: Duration::from_secs(3600),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            job_timeout: Duration::from_secs(
                std::env::var("WORKER_JOB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            concurrent_fragments: std::env::var("WORKER_CONCURRENT_FRAGMENTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.concurrent_fragments),
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or(defaults.ffmpeg_path),
            cookies_path: std::env::var("YTDLP_COOKIES_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            job_retention: Duration::from_secs(
                std::env::var("JOB_RETENTION_HOURS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(24)
                    * 3600,
            ),
            purge_interval: Duration::from_secs(
                std::env::var("JOB_PURGE_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(3600)
                    .max(1),
            ),
        }
    }

    /// Downloaded section for a job.
    pub fn input_path(&self, job_id: &str) -> PathBuf {
        self.work_dir.join(format!("clip-{}.mp4", job_id))
    }

    /// Final artifact for a job.
    pub fn output_path(&self, job_id: &str) -> PathBuf {
        self.work_dir.join(format!("clip-{}-fast.mp4", job_id))
    }
}
