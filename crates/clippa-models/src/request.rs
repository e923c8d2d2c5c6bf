//! Clip submission request and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::timecode::parse_timecode;

/// Reasons a clip request is rejected before a job is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("End time must be after start time")]
    InvalidRange,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Raw clip submission as received from a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub subtitles: bool,
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ClipRequest {
    /// Check required fields, the time range and URL syntax.
    pub fn validate(&self) -> Result<ValidatedClip, RequestError> {
        let url = required(&self.url, "url")?;
        let start_time = required(&self.start_time, "startTime")?;
        let end_time = required(&self.end_time, "endTime")?;
        let user_id = required(&self.user_id, "userId")?;

        let start_secs = parse_timecode(start_time);
        let end_secs = parse_timecode(end_time);
        if end_secs <= start_secs {
            return Err(RequestError::InvalidRange);
        }

        let parsed = Url::parse(url).map_err(|e| RequestError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(RequestError::InvalidUrl(url.to_string()));
        }

        let format_id = self
            .format_id
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from);

        Ok(ValidatedClip {
            url: url.to_string(),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            start_secs,
            end_secs,
            subtitles: self.subtitles,
            format_id,
            user_id: user_id.to_string(),
        })
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, RequestError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(RequestError::MissingField(name))
}

/// A request that passed validation. The range is guaranteed `end > start`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedClip {
    pub url: String,
    pub start_time: String,
    pub end_time: String,
    pub start_secs: f64,
    pub end_secs: f64,
    pub subtitles: bool,
    pub format_id: Option<String>,
    pub user_id: String,
}

impl ValidatedClip {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}
