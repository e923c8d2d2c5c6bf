//! Job record storage.
//!
//! The orchestrator writes job records through the [`JobStore`] trait.
//! Production uses [`PostgrestJobStore`] against a Supabase `jobs` table;
//! [`MemoryJobStore`] serves local development and tests.

pub mod error;
pub mod memory;
pub mod metrics;
pub mod postgrest;
pub mod retry;
pub mod store;

pub use error::{DbError, DbResult};
pub use memory::MemoryJobStore;
pub use postgrest::{PostgrestConfig, PostgrestJobStore};
pub use retry::RetryConfig;
pub use store::JobStore;
