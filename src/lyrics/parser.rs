//! LRC format parser.
//!
//! Parses synchronized lyrics in the line format `[mm:ss.cc]text`. Lines that
//! do not match, and lines whose text is empty after trimming, are dropped;
//! malformed input degrades to fewer lines, never an error.

/// A single timed lyric line.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    /// Seconds from the start of the track.
    pub time: f64,
    pub text: String,
}

/// Parse LRC text into lines sorted ascending by time (stable; ties keep
/// input order).
pub fn parse(lrc: &str) -> Vec<LyricLine> {
    let mut lines: Vec<LyricLine> = lrc.lines().filter_map(parse_line).collect();
    lines.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
    lines
}

fn parse_line(line: &str) -> Option<LyricLine> {
    let rest = line.trim_start().strip_prefix('[')?;
    let close = rest.find(']')?;
    let stamp = &rest[..close];
    let text = rest[close + 1..].trim();
    if text.is_empty() {
        return None;
    }

    let (minutes, rest) = stamp.split_once(':')?;
    let (seconds, centis) = rest.split_once('.')?;
    let (Some(m), Some(s), Some(c)) = (
        parse_digits(minutes),
        parse_digits(seconds),
        parse_digits(centis),
    ) else {
        return None;
    };

    Some(LyricLine {
        time: m * 60.0 + s + c / 100.0,
        text: text.to_string(),
    })
}

fn parse_digits(s: &str) -> Option<f64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
