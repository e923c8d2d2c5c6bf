//! Blob storage for finished clips.
//!
//! Clips are written once under `clip-<job id>.mp4` and served either
//! through their public URL or a short-lived presigned download URL.

pub mod blob;
pub mod client;
pub mod error;

pub use blob::{clip_key, BlobStore, CLIP_CONTENT_TYPE};
pub use client::{attachment_disposition, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
