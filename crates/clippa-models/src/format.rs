//! Remote media metadata and user-facing format options.

use serde::{Deserialize, Serialize};

/// One available encoding as reported by the metadata source.
///
/// Codec fields use the literal `"none"` for an absent track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFormat {
    pub format_id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub tbr: Option<f64>,
}

impl RawFormat {
    pub fn has_video(&self) -> bool {
        is_present_codec(self.vcodec.as_deref())
    }

    pub fn has_audio(&self) -> bool {
        is_present_codec(self.acodec.as_deref())
    }
}

fn is_present_codec(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if !c.is_empty() && c != "none")
}

/// Selectable format shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOption {
    pub format_id: String,
    pub label: String,
}

/// Metadata for a remote video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub formats: Option<Vec<RawFormat>>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub webpage_url: Option<String>,
}

impl VideoInfo {
    pub fn summary(&self) -> VideoSummary {
        VideoSummary {
            title: self.title.clone(),
            thumbnail: self.thumbnail.clone(),
            duration: self.duration,
            webpage_url: self.webpage_url.clone(),
        }
    }
}

/// Display subset of [`VideoInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub webpage_url: Option<String>,
}
