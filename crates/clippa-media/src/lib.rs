//! yt-dlp and FFmpeg wrappers for clip production.
//!
//! This crate provides:
//! - A cancellable runner for line-oriented external tools
//! - Progress scraping and mapping onto a single 0-100 scale
//! - Section download (yt-dlp) and remux/burn-in (FFmpeg) stages
//! - Caption time shifting and format resolution
//! - Cached metadata lookups

pub mod cache;
pub mod captions;
pub mod command;
pub mod download;
pub mod error;
pub mod formats;
pub mod fs_utils;
pub mod metadata;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod transcode;

pub use cache::TtlCache;
pub use captions::{shift_caption_file, shift_captions};
pub use command::FfmpegCommand;
pub use download::{YtDlpAcquirer, DEFAULT_FORMAT};
pub use error::{MediaError, MediaResult};
pub use formats::{resolve_formats, BEST_AUDIO_SUFFIX, DEFAULT_MAX_PIXELS};
pub use fs_utils::{move_file, remove_if_exists};
pub use metadata::{
    metadata_cache_key, MetadataConfig, MetadataService, MetadataSource, YtDlpMetadataSource,
};
pub use pipeline::{
    captions_path_for, AcquireRequest, MediaAcquirer, MediaTranscoder, ProgressFn,
    TranscodeRequest,
};
pub use process::{ToolOutput, ToolRunner};
pub use transcode::FfmpegTranscoder;
