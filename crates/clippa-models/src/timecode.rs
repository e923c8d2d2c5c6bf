//! Timecode parsing and formatting.
//!
//! Supports `HH:MM:SS[.mmm]`, `MM:SS[.mmm]` and `SS[.mmm]`. Parsing is
//! lenient: anything that cannot be read yields `0.0`, so callers that care
//! about sanity (e.g. `end > start`) must check it themselves.

/// Parse a timecode string to fractional seconds.
///
/// # Examples
/// ```
/// use clippa_models::timecode::parse_timecode;
/// assert_eq!(parse_timecode("01:02:03"), 3723.0);
/// assert_eq!(parse_timecode("05:30"), 330.0);
/// assert_eq!(parse_timecode(""), 0.0);
/// ```
pub fn parse_timecode(ts: &str) -> f64 {
    let ts = ts.trim();
    if ts.is_empty() {
        return 0.0;
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let seconds = match parts.as_slice() {
        [h, m, s] => whole(h)
            .zip(whole(m))
            .zip(fractional(s))
            .map(|((h, m), s)| h * 3600.0 + m * 60.0 + s),
        [m, s] => whole(m).zip(fractional(s)).map(|(m, s)| m * 60.0 + s),
        [s] => fractional(s),
        _ => None,
    };

    seconds.filter(|s| s.is_finite()).unwrap_or(0.0)
}

/// Format seconds as zero-padded `HH:MM:SS.mmm`.
///
/// Negative and non-finite input formats as zero.
pub fn format_timecode(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };

    let hours = total_ms / 3_600_000;
    let mins = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
}

/// Hours/minutes component: integer part only.
fn whole(part: &str) -> Option<f64> {
    part.trim().parse::<f64>().ok().map(f64::trunc)
}

fn fractional(part: &str) -> Option<f64> {
    part.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hh_mm_ss() {
        assert_eq!(parse_timecode("01:02:03"), 3723.0);
        assert_eq!(parse_timecode("00:00:00"), 0.0);
        assert_eq!(parse_timecode("1:30:45"), 5445.0);
    }

    #[test]
    fn test_parse_mm_ss_and_ss() {
        assert_eq!(parse_timecode("05:30"), 330.0);
        assert_eq!(parse_timecode("90"), 90.0);
    }

    #[test]
    fn test_parse_with_milliseconds() {
        assert!((parse_timecode("00:01:30.250") - 90.25).abs() < 1e-9);
        assert!((parse_timecode("01:30.500") - 90.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_timecode(""), 0.0);
        assert_eq!(parse_timecode("   "), 0.0);
        assert_eq!(parse_timecode("abc"), 0.0);
        assert_eq!(parse_timecode("1:2:3:4"), 0.0);
        assert_eq!(parse_timecode("aa:10"), 0.0);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_timecode(3723.0), "01:02:03.000");
        assert_eq!(format_timecode(1.5), "00:00:01.500");
        assert_eq!(format_timecode(0.0), "00:00:00.000");
        assert_eq!(format_timecode(-4.0), "00:00:00.000");
    }

    #[test]
    fn test_format_rounds_to_millis() {
        assert_eq!(format_timecode(59.9996), "00:01:00.000");
        assert_eq!(format_timecode(30.0004), "00:00:30.000");
    }

    #[test]
    fn test_format_is_idempotent() {
        for input in ["01:02:03", "05:30", "7", "00:00:01.5", "10:00:00.123"] {
            let once = format_timecode(parse_timecode(input));
            let twice = format_timecode(parse_timecode(&once));
            assert_eq!(once, twice, "input {}", input);
        }
    }
}
