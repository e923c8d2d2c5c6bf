//! Shared data models for the Clippa backend.
//!
//! This crate provides Serde-serializable types for:
//! - Clip jobs, their status/stage and partial updates
//! - Clip submission requests and their validation
//! - Remote media metadata and user-facing format options
//! - Timecode parsing and formatting

pub mod format;
pub mod job;
pub mod request;
pub mod timecode;

// Re-export common types
pub use format::{FormatOption, RawFormat, VideoInfo, VideoSummary};
pub use job::{Job, JobId, JobStage, JobStatus, JobStatusView, JobUpdate};
pub use request::{ClipRequest, RequestError, ValidatedClip};
pub use timecode::{format_timecode, parse_timecode};
