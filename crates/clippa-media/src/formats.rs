//! Format Resolver: raw encodings to a user-facing format list.

use std::collections::HashMap;

use clippa_models::{FormatOption, RawFormat};

/// 8K pixel ceiling.
pub const DEFAULT_MAX_PIXELS: u64 = 7680 * 4320;

/// Appended to video-only format ids so the downloader muxes in audio.
pub const BEST_AUDIO_SUFFIX: &str = "+bestaudio";

const ALLOWED_CONTAINERS: [&str; 2] = ["mp4", "webm"];

#[derive(Debug, Clone)]
struct FormatCandidate {
    format_id: String,
    label: String,
    height: u32,
    has_audio: bool,
}

/// Filter, label, sort and deduplicate raw formats.
///
/// One entry per distinct label, highest resolution first. Within a label
/// the first candidate wins unless a later one carries audio and it does not.
pub fn resolve_formats(raw: &[RawFormat], max_pixels: u64) -> Vec<FormatOption> {
    let mut candidates: Vec<FormatCandidate> = raw
        .iter()
        .filter_map(|format| candidate(format, max_pixels))
        .collect();

    // Stable sort keeps filter order for equal heights.
    candidates.sort_by(|a, b| b.height.cmp(&a.height));

    let mut kept: Vec<FormatCandidate> = Vec::new();
    let mut by_label: HashMap<String, usize> = HashMap::new();
    for candidate in candidates {
        match by_label.get(&candidate.label) {
            Some(&idx) => {
                if candidate.has_audio && !kept[idx].has_audio {
                    kept[idx] = candidate;
                }
            }
            None => {
                by_label.insert(candidate.label.clone(), kept.len());
                kept.push(candidate);
            }
        }
    }

    kept.into_iter()
        .map(|c| FormatOption {
            format_id: if c.has_audio {
                c.format_id
            } else {
                format!("{}{}", c.format_id, BEST_AUDIO_SUFFIX)
            },
            label: c.label,
        })
        .collect()
}

fn candidate(format: &RawFormat, max_pixels: u64) -> Option<FormatCandidate> {
    if !format.has_video() {
        return None;
    }
    let (width, height) = (format.width?, format.height?);
    if u64::from(width) * u64::from(height) > max_pixels {
        return None;
    }
    let ext = format.ext.as_deref()?;
    if !ALLOWED_CONTAINERS.contains(&ext) {
        return None;
    }

    Some(FormatCandidate {
        format_id: format.format_id.clone(),
        label: format_label(height, format.fps, format.vcodec.as_deref().unwrap_or("")),
        height,
        has_audio: format.has_audio(),
    })
}

/// `1080p`, `1080p60`, `2160p60 (AV1)`.
fn format_label(height: u32, fps: Option<f64>, vcodec: &str) -> String {
    let mut label = format!("{}p", height);
    if let Some(fps) = fps.filter(|fps| *fps > 30.0) {
        label.push_str(&fps.to_string());
    }
    if vcodec.contains("av01") {
        label.push_str(" (AV1)");
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(id: &str, ext: &str, height: u32, fps: f64, vcodec: &str, acodec: &str) -> RawFormat {
        RawFormat {
            format_id: id.into(),
            ext: Some(ext.into()),
            width: Some(height * 16 / 9),
            height: Some(height),
            fps: Some(fps),
            vcodec: Some(vcodec.into()),
            acodec: Some(acodec.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(format_label(1080, Some(30.0), "avc1"), "1080p");
        assert_eq!(format_label(1080, Some(60.0), "avc1"), "1080p60");
        assert_eq!(format_label(2160, Some(60.0), "av01.0.12M.08"), "2160p60 (AV1)");
        assert_eq!(format_label(720, None, "vp9"), "720p");
    }

    #[test]
    fn test_audio_variant_replaces_video_only() {
        let raw = vec![
            fmt("136", "mp4", 720, 30.0, "avc1", "none"),
            fmt("22", "mp4", 720, 30.0, "avc1", "mp4a.40.2"),
        ];
        let out = resolve_formats(&raw, DEFAULT_MAX_PIXELS);
        assert_eq!(
            out,
            vec![FormatOption {
                format_id: "22".into(),
                label: "720p".into()
            }]
        );
    }

    #[test]
    fn test_video_only_gets_audio_suffix() {
        let raw = vec![fmt("137", "mp4", 1080, 30.0, "avc1", "none")];
        let out = resolve_formats(&raw, DEFAULT_MAX_PIXELS);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].format_id, "137+bestaudio");
        assert_eq!(out[0].label, "1080p");
    }

    #[test]
    fn test_first_wins_when_both_lack_or_have_audio() {
        let raw = vec![
            fmt("137", "mp4", 1080, 30.0, "avc1", "none"),
            fmt("248", "webm", 1080, 30.0, "vp9", "none"),
        ];
        let out = resolve_formats(&raw, DEFAULT_MAX_PIXELS);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].format_id, "137+bestaudio");
    }

    #[test]
    fn test_filter_and_sort() {
        let mut no_height = fmt("x", "mp4", 480, 30.0, "avc1", "none");
        no_height.height = None;
        let raw = vec![
            fmt("18", "mp4", 360, 30.0, "avc1", "mp4a.40.2"),
            fmt("140", "m4a", 0, 0.0, "none", "mp4a.40.2"),
            fmt("299", "mp4", 1080, 60.0, "avc1", "none"),
            fmt("flv", "flv", 720, 30.0, "h263", "mp3"),
            fmt("huge", "mp4", 8640, 30.0, "avc1", "none"),
            no_height,
            fmt("398", "mp4", 720, 30.0, "av01.0.05M.08", "none"),
        ];
        let out = resolve_formats(&raw, DEFAULT_MAX_PIXELS);
        let labels: Vec<&str> = out.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["1080p60", "720p (AV1)", "360p"]);
        assert_eq!(out[2].format_id, "18");
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve_formats(&[], DEFAULT_MAX_PIXELS).is_empty());
    }
}
