//! WebVTT cue time shifting.
//!
//! Downloaded captions keep the source video's timeline; after trimming they
//! must be moved back by the clip's start offset before burn-in.

use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

use clippa_models::timecode::{format_timecode, parse_timecode};

use crate::error::MediaResult;
use crate::fs_utils::replace_file_contents;

static CUE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{1,2}:\d{2}:\d{2}\.\d{3}|\d{2}:\d{2}\.\d{3}) --> (\d{1,2}:\d{2}:\d{2}\.\d{3}|\d{2}:\d{2}\.\d{3})",
    )
    .expect("valid cue timing regex")
});

/// Shift every cue timing line back by `shift_secs`.
///
/// A cue whose shifted start would be negative is left exactly as it was.
/// Everything that is not a timing match passes through untouched.
pub fn shift_captions(text: &str, shift_secs: f64) -> String {
    CUE_TIMING
        .replace_all(text, |caps: &Captures| {
            let start = parse_timecode(&caps[1]) - shift_secs;
            if start < 0.0 {
                return caps[0].to_string();
            }
            let end = parse_timecode(&caps[2]) - shift_secs;
            format!("{} --> {}", format_timecode(start), format_timecode(end))
        })
        .into_owned()
}

/// Rewrite a caption file in place, replacing it atomically.
pub async fn shift_caption_file(path: &Path, shift_secs: f64) -> MediaResult<()> {
    let text = tokio::fs::read_to_string(path).await?;
    let shifted = shift_captions(&text, shift_secs);
    replace_file_contents(path, shifted.as_bytes()).await
}
