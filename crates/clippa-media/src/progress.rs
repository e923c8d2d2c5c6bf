//! Progress extraction from tool output.
//!
//! Neither tool exposes structured progress, so lines are scraped with
//! regexes. The download stage owns 0..=50 of overall progress and the
//! encode stage owns 50..=100.

use regex::Regex;
use std::sync::LazyLock;

static DOWNLOAD_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").expect("valid download percent regex")
});

static DOWNLOAD_DESTINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[download\] Destination: (.+)$").expect("valid destination regex")
});

/// Caption files yt-dlp may write alongside the media.
const CAPTION_EXTENSIONS: [&str; 3] = [".vtt", ".srt", ".ttml"];

// Matches both `time=00:00:01.50` status lines and `out_time=00:00:01.500000`
// from `-progress pipe:2`.
static ENCODE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid encode time regex")
});

/// Download percentage from a yt-dlp line such as
/// `[download]  45.3% of 10.00MiB at 2.00MiB/s ETA 00:03`.
pub fn parse_download_percent(line: &str) -> Option<f64> {
    let caps = DOWNLOAD_PERCENT.captures(line)?;
    caps[1].parse::<f64>().ok()
}

/// Tracks which file yt-dlp is currently writing so caption downloads do
/// not count towards media progress.
#[derive(Debug, Default)]
pub struct DownloadTracker {
    in_captions: bool,
}

impl DownloadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overall progress (0..=50) for a media download line, if any.
    pub fn observe(&mut self, line: &str) -> Option<u8> {
        if let Some(caps) = DOWNLOAD_DESTINATION.captures(line) {
            self.in_captions = is_caption_file(caps[1].trim());
            return None;
        }
        if line.starts_with("[info] Writing video subtitles") {
            self.in_captions = true;
            return None;
        }
        if self.in_captions {
            return None;
        }
        parse_download_percent(line).map(download_to_overall)
    }
}

fn is_caption_file(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    CAPTION_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Elapsed encode time in seconds from an FFmpeg progress line.
pub fn parse_encode_time(line: &str) -> Option<f64> {
    let caps = ENCODE_TIME.captures(line)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Encode percentage for `elapsed` seconds out of `total` seconds.
pub fn encode_percent(elapsed_secs: f64, total_secs: f64) -> f64 {
    if total_secs <= 0.0 || !total_secs.is_finite() {
        return 0.0;
    }
    (elapsed_secs / total_secs * 100.0).clamp(0.0, 100.0)
}

/// Map a download percentage onto the first half of overall progress.
pub fn download_to_overall(percent: f64) -> u8 {
    (clamp_percent(percent) / 2.0).floor() as u8
}

/// Map an encode percentage onto the second half of overall progress.
pub fn encode_to_overall(percent: f64) -> u8 {
    50 + (clamp_percent(percent) / 2.0).floor() as u8
}

fn clamp_percent(percent: f64) -> f64 {
    if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_download_percent() {
        assert_eq!(
            parse_download_percent("[download]  45.3% of 10.00MiB at 2.00MiB/s ETA 00:03"),
            Some(45.3)
        );
        assert_eq!(parse_download_percent("[download] 100% of 10.00MiB"), Some(100.0));
        assert_eq!(parse_download_percent("[info] Downloading 1 format(s): 137+140"), None);
        assert_eq!(parse_download_percent("[ffmpeg] Merging 50% of streams"), None);
        assert_eq!(parse_download_percent("WARNING: 12% of fragments missing"), None);
    }

    #[test]
    fn test_tracker_skips_caption_download() {
        let mut tracker = DownloadTracker::new();
        let lines = [
            "[info] Writing video subtitles to: /w/clip-a.en.vtt",
            "[download] Destination: /w/clip-a.en.vtt",
            "[download] 100% of 12.00KiB in 00:00:00",
            "[download] Destination: /w/clip-a.mp4",
            "[download]  10.0% of 10.00MiB at 2.00MiB/s ETA 00:04",
            "[download]  60.0% of 10.00MiB at 2.00MiB/s ETA 00:02",
            "[download]  90.0% of 10.00MiB at 2.00MiB/s ETA 00:01",
        ];
        let values: Vec<u8> = lines.iter().filter_map(|l| tracker.observe(l)).collect();
        assert_eq!(values, vec![5, 30, 45]);
    }

    #[test]
    fn test_tracker_counts_without_destination_line() {
        let mut tracker = DownloadTracker::new();
        assert_eq!(tracker.observe("[download]  45.3% of 10.00MiB"), Some(22));
        assert_eq!(tracker.observe("[download] Destination: /w/clip-a.en.VTT"), None);
        assert_eq!(tracker.observe("[download] 100% of 1.00KiB"), None);
    }

    #[test]
    fn test_parse_encode_time() {
        assert_eq!(parse_encode_time("out_time=00:00:05.500000"), Some(5.5));
        assert_eq!(
            parse_encode_time("frame=  120 fps=60 q=28.0 size=512kB time=00:01:02.50 bitrate=1.2kbits/s"),
            Some(62.5)
        );
        assert_eq!(parse_encode_time("out_time=N/A"), None);
        assert_eq!(parse_encode_time("progress=continue"), None);
    }

    #[test]
    fn test_overall_mapping() {
        assert_eq!(download_to_overall(0.0), 0);
        assert_eq!(download_to_overall(45.3), 22);
        assert_eq!(download_to_overall(100.0), 50);
        assert_eq!(download_to_overall(250.0), 50);

        assert_eq!(encode_to_overall(0.0), 50);
        assert_eq!(encode_to_overall(51.0), 75);
        assert_eq!(encode_to_overall(100.0), 100);
        assert_eq!(encode_to_overall(-3.0), 50);
    }

    #[test]
    fn test_encode_percent() {
        assert_eq!(encode_percent(5.0, 10.0), 50.0);
        assert_eq!(encode_percent(12.0, 10.0), 100.0);
        assert_eq!(encode_percent(5.0, 0.0), 0.0);
    }
}
