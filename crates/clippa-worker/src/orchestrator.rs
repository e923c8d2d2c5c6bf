//! Clip job orchestration.
//!
//! A submission is validated, recorded as `processing`, and then driven in
//! a background task through download, optional caption burn-in and upload.
//! The record always ends in `ready` or `error`.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use clippa_db::JobStore;
use clippa_media::{
    captions_path_for, move_file, remove_if_exists, shift_caption_file, AcquireRequest,
    MediaAcquirer, MediaError, MediaTranscoder, TranscodeRequest,
};
use clippa_models::{ClipRequest, JobId, JobStage, JobUpdate, ValidatedClip};
use clippa_storage::{clip_key, BlobStore, CLIP_CONTENT_TYPE};

use crate::config::WorkerConfig;
use crate::error::{SubmitError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::progress::ProgressReporter;

/// Cancels a running job. The job's stages observe it through a watch channel.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a finished clip landed.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredClip {
    pub storage_path: String,
    pub public_url: String,
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Drives clip jobs from submission to a terminal record.
#[derive(Clone)]
pub struct ClipOrchestrator {
    jobs: Arc<dyn JobStore>,
    blobs: Arc<dyn BlobStore>,
    acquirer: Arc<dyn MediaAcquirer>,
    transcoder: Arc<dyn MediaTranscoder>,
    config: WorkerConfig,
}

impl ClipOrchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        blobs: Arc<dyn BlobStore>,
        acquirer: Arc<dyn MediaAcquirer>,
        transcoder: Arc<dyn MediaTranscoder>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            jobs,
            blobs,
            acquirer,
            transcoder,
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn jobs(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Validate and record a request, then process it in the background.
    ///
    /// Returns as soon as the `processing` record exists.
    pub async fn submit(&self, request: ClipRequest) -> Result<JobId, SubmitError> {
        self.submit_with_cancel(request)
            .await
            .map(|(job_id, _)| job_id)
    }

    /// Like [`submit`](Self::submit), also returning a handle that aborts the job.
    pub async fn submit_with_cancel(
        &self,
        request: ClipRequest,
    ) -> Result<(JobId, CancelHandle), SubmitError> {
        let clip = request.validate()?;
        let job_id = JobId::new();

        self.jobs.create_job(job_id.as_str(), &clip.user_id).await?;
        metrics::record_submitted(clip.subtitles);
        info!(
            job_id = %job_id,
            user_id = %clip.user_id,
            start = %clip.start_time,
            end = %clip.end_time,
            subtitles = clip.subtitles,
            "Clip job submitted"
        );

        let cancel = CancelHandle::new();
        let orchestrator = self.clone();
        let task_id = job_id.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = orchestrator.run_job(&task_id, &clip, task_cancel).await;
        });

        Ok((job_id, cancel))
    }

    /// Run one job to completion and write its terminal record.
    ///
    /// The job is cancelled once `job_timeout` elapses.
    pub async fn run_job(
        &self,
        job_id: &JobId,
        clip: &ValidatedClip,
        cancel: CancelHandle,
    ) -> WorkerResult<DeliveredClip> {
        let logger = JobLogger::new(job_id, "clip");
        let span = logger.create_span();

        async {
            logger.log_start(&format!("{} [{} - {}]", clip.url, clip.start_time, clip.end_time));
            let started = Instant::now();

            let _timer = AbortOnDrop(self.spawn_timeout(cancel.clone(), logger.clone()));
            let reporter = ProgressReporter::spawn(Arc::clone(&self.jobs), job_id.as_str());

            let result = self
                .execute(job_id, clip, &cancel, &reporter, &logger)
                .await;

            // Queued progress must land before the terminal write.
            reporter.finish().await;

            let elapsed = started.elapsed().as_secs_f64();
            let update = match &result {
                Ok(delivered) => {
                    metrics::record_completed(elapsed);
                    logger.log_completion(&delivered.public_url);
                    JobUpdate::ready(&delivered.storage_path, &delivered.public_url)
                }
                Err(e) => {
                    metrics::record_failed(elapsed, e.is_aborted());
                    logger.log_error(&e.to_string());
                    self.cleanup_local_files(job_id, &logger).await;
                    JobUpdate::failed(e.user_message())
                }
            };

            if let Err(e) = self.jobs.update_job(job_id.as_str(), &update).await {
                logger.log_error(&format!("Failed to write terminal status: {}", e));
            }

            result
        }
        .instrument(span)
        .await
    }

    fn spawn_timeout(&self, cancel: CancelHandle, logger: JobLogger) -> JoinHandle<()> {
        let timeout = self.config.job_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            logger.log_warning(&format!("Timed out after {}s, cancelling", timeout.as_secs()));
            cancel.cancel();
        })
    }

    async fn execute(
        &self,
        job_id: &JobId,
        clip: &ValidatedClip,
        cancel: &CancelHandle,
        reporter: &ProgressReporter,
        logger: &JobLogger,
    ) -> WorkerResult<DeliveredClip> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let input_path = self.config.input_path(job_id.as_str());
        let output_path = self.config.output_path(job_id.as_str());

        self.set_stage(job_id, JobStage::Downloading, logger).await;
        let acquire = AcquireRequest {
            job_id: job_id.to_string(),
            url: clip.url.clone(),
            start_time: clip.start_time.clone(),
            end_time: clip.end_time.clone(),
            format_id: clip.format_id.clone(),
            captions: clip.subtitles,
            output_path: input_path,
        };
        let downloaded = self
            .acquirer
            .acquire(&acquire, cancel.subscribe(), reporter.callback())
            .await?;
        logger.log_progress("download finished");

        if clip.subtitles {
            let captions_path = captions_path_for(&downloaded);
            let has_captions = tokio::fs::try_exists(&captions_path).await.unwrap_or(false);
            if has_captions {
                // Captions come back in source-video time
                shift_caption_file(&captions_path, clip.start_secs).await?;
            } else {
                logger.log_warning("no captions available, encoding without burn-in");
            }

            self.set_stage(job_id, JobStage::Processing, logger).await;
            let transcode = TranscodeRequest {
                job_id: job_id.to_string(),
                input_path: downloaded.clone(),
                output_path: output_path.clone(),
                burn_captions: true,
                captions_path: has_captions.then(|| captions_path.clone()),
                duration_secs: clip.duration_secs(),
            };
            self.transcoder
                .transcode(&transcode, cancel.subscribe(), reporter.callback())
                .await?;

            remove_logged(&downloaded, logger).await;
            if has_captions {
                remove_logged(&captions_path, logger).await;
            }
        } else {
            move_file(&downloaded, &output_path).await?;
            reporter.report(100);
        }

        if cancel.is_cancelled() {
            return Err(MediaError::Aborted.into());
        }

        self.set_stage(job_id, JobStage::Uploading, logger).await;
        let key = clip_key(job_id.as_str());
        let public_url = self
            .blobs
            .upload_file(&output_path, &key, CLIP_CONTENT_TYPE)
            .await?;
        remove_logged(&output_path, logger).await;

        Ok(DeliveredClip {
            storage_path: key,
            public_url,
        })
    }

    /// Stage writes are best-effort; a failed write does not fail the job.
    async fn set_stage(&self, job_id: &JobId, stage: JobStage, logger: &JobLogger) {
        logger.log_progress(&format!("stage {}", stage.as_str()));
        if let Err(e) = self
            .jobs
            .update_job(job_id.as_str(), &JobUpdate::stage(stage))
            .await
        {
            logger.log_warning(&format!("Failed to persist stage {}: {}", stage.as_str(), e));
        }
    }

    async fn cleanup_local_files(&self, job_id: &JobId, logger: &JobLogger) {
        let input_path = self.config.input_path(job_id.as_str());
        let captions_path = captions_path_for(&input_path);
        let output_path = self.config.output_path(job_id.as_str());
        for path in [input_path, captions_path, output_path] {
            remove_logged(&path, logger).await;
        }
    }
}

async fn remove_logged(path: &Path, logger: &JobLogger) {
    if let Err(e) = remove_if_exists(path).await {
        logger.log_warning(&format!("Failed to remove {}: {}", path.display(), e));
    }
}
