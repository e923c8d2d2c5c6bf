//! Job metrics.

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    pub const JOBS_SUBMITTED: &str = "clippa_jobs_submitted_total";
    pub const JOBS_COMPLETED: &str = "clippa_jobs_completed_total";
    pub const JOBS_FAILED: &str = "clippa_jobs_failed_total";
    pub const JOBS_TIMED_OUT: &str = "clippa_jobs_timed_out_total";
    pub const JOB_DURATION_SECONDS: &str = "clippa_job_duration_seconds";
    pub const JOBS_PURGED: &str = "clippa_jobs_purged_total";
}

pub fn record_submitted(captions: bool) {
    counter!(names::JOBS_SUBMITTED, "captions" => captions.to_string()).increment(1);
}

pub fn record_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "status" => "ready").record(duration_secs);
}

pub fn record_failed(duration_secs: f64, timed_out: bool) {
    if timed_out {
        counter!(names::JOBS_TIMED_OUT).increment(1);
    } else {
        counter!(names::JOBS_FAILED).increment(1);
    }
    histogram!(names::JOB_DURATION_SECONDS, "status" => "error").record(duration_secs);
}

pub fn record_purged(count: u64) {
    counter!(names::JOBS_PURGED).increment(count);
}
