//! Final remux or caption burn-in with FFmpeg.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::info;

use crate::command::{subtitles_filter, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::pipeline::{MediaTranscoder, ProgressFn, TranscodeRequest};
use crate::process::ToolRunner;
use crate::progress::{encode_percent, encode_to_overall, parse_encode_time};

/// [`MediaTranscoder`] backed by the FFmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the command. `captions` is the caption file to burn in, if any.
    pub fn build_command(input: &Path, output: &Path, captions: Option<&Path>) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(input, output);
        let cmd = match captions {
            Some(captions) => cmd
                .video_filter(subtitles_filter(captions))
                .video_codec("libx264")
                .preset("ultrafast")
                .crf(28)
                .audio_codec("aac")
                .audio_bitrate("128k"),
            None => cmd.video_codec("copy").audio_codec("copy"),
        };
        cmd.faststart()
    }
}

#[async_trait]
impl MediaTranscoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        request: &TranscodeRequest,
        cancel: watch::Receiver<bool>,
        progress: ProgressFn,
    ) -> MediaResult<PathBuf> {
        let mut captions = None;
        if let (Some(path), true) = (request.captions_path.as_deref(), request.burn_captions) {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                captions = Some(path);
            }
        }

        info!(
            job_id = %request.job_id,
            burn_in = captions.is_some(),
            input = %request.input_path.display(),
            "Transcoding clip"
        );

        progress(50);

        let args = Self::build_command(&request.input_path, &request.output_path, captions)
            .build_args();
        let duration = request.duration_secs;

        ToolRunner::new(&self.program)
            .with_cancel(cancel)
            .run(&args, |line| {
                if let Some(elapsed) = parse_encode_time(line) {
                    progress(encode_to_overall(encode_percent(elapsed, duration)));
                }
            })
            .await?;

        if !tokio::fs::try_exists(&request.output_path).await? {
            return Err(MediaError::OutputMissing(request.output_path.clone()));
        }

        Ok(request.output_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_when_no_captions() {
        let args = FfmpegTranscoder::build_command(
            Path::new("/w/clip-a.mp4"),
            Path::new("/w/clip-a-fast.mp4"),
            None,
        )
        .build_args();
        let joined = args.join(" ");

        assert!(joined.contains("-c:v copy -c:a copy"));
        assert!(joined.contains("-movflags +faststart"));
        assert!(!joined.contains("-vf"));
        assert_eq!(args.last().map(String::as_str), Some("/w/clip-a-fast.mp4"));
    }

    #[test]
    fn test_burn_in_reencodes() {
        let args = FfmpegTranscoder::build_command(
            Path::new("/w/clip-a.mp4"),
            Path::new("/w/clip-a-fast.mp4"),
            Some(Path::new("/w/clip-a.en.vtt")),
        )
        .build_args();
        let joined = args.join(" ");

        assert!(joined.contains("-vf subtitles=/w/clip-a.en.vtt"));
        assert!(joined.contains("-c:v libx264 -preset ultrafast -crf 28"));
        assert!(joined.contains("-c:a aac -b:a 128k"));
        assert!(joined.contains("-movflags +faststart"));
    }
}
