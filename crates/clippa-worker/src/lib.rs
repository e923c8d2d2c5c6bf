//! Clip job orchestration.
//!
//! Ties the media stages, blob storage and the job store together:
//! - [`ClipOrchestrator`] validates submissions and drives each job
//!   through download, optional caption burn-in and upload
//! - [`ProgressReporter`] persists monotonic progress per job
//! - [`spawn_purge_task`] removes expired job records

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod purge;

pub use config::WorkerConfig;
pub use error::{SubmitError, WorkerError, WorkerResult, TIMEOUT_MESSAGE};
pub use logging::JobLogger;
pub use orchestrator::{CancelHandle, ClipOrchestrator, DeliveredClip};
pub use progress::ProgressReporter;
pub use purge::{purge_once, spawn_purge_task};
