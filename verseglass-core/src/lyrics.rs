//! Synced-lyrics transcript parsing and active-line selection.
//!
//! The transcript format is one line per lyric, each prefixed with a
//! `[mm:ss.ff]` or `[mm:ss.fff]` timestamp (2-digit minutes, 2-digit
//! seconds, 2-3 fractional digits). Anything that does not match the
//! grammar is skipped; lines whose text is empty after trimming are
//! discarded.

use std::time::Duration;

/// A single lyric line with its offset from track start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub timestamp: Duration,
    pub text: String,
}

/// Parse a synced-lyrics blob into an ordered transcript.
///
/// Lines are stable-sorted by timestamp afterwards; sources are expected
/// ordered, but out-of-order results have been observed in the wild.
#[must_use]
pub fn parse_synced(input: &str) -> Vec<LyricLine> {
    let mut lines: Vec<LyricLine> = input.lines().filter_map(parse_line).collect();
    lines.sort_by_key(|l| l.timestamp);
    lines
}

/// Parse one `[mm:ss.fff]text` line. Returns `None` for non-matching or
/// empty-text lines.
fn parse_line(line: &str) -> Option<LyricLine> {
    let rest = line.strip_prefix('[')?;
    let (stamp, text) = rest.split_once(']')?;
    let timestamp = parse_timestamp(stamp)?;

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(LyricLine {
        timestamp,
        text: text.to_string(),
    })
}

/// Parse `mm:ss.ff` / `mm:ss.fff` into a duration.
fn parse_timestamp(stamp: &str) -> Option<Duration> {
    let (minutes, seconds) = stamp.split_once(':')?;
    if minutes.len() != 2 || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (whole, frac) = seconds.split_once('.')?;
    if whole.len() != 2 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !(2..=3).contains(&frac.len()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let minutes: u64 = minutes.parse().ok()?;
    let whole: u64 = whole.parse().ok()?;
    // Two fractional digits are hundredths, three are milliseconds
    let frac_ms: u64 = match frac.len() {
        2 => frac.parse::<u64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };

    Some(Duration::from_millis(
        minutes * 60_000 + whole * 1000 + frac_ms,
    ))
}

/// Index of the active line for a playback position: the largest `i` with
/// `lines[i].timestamp <= position`, or `None` before the first line.
///
/// Requires `lines` sorted by timestamp, which [`parse_synced`] guarantees.
#[must_use]
pub fn active_line_index(lines: &[LyricLine], position: Duration) -> Option<usize> {
    lines
        .partition_point(|l| l.timestamp <= position)
        .checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_line() {
        let lines = parse_synced("[00:12.340]Hello");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].timestamp, Duration::from_millis(12340));
        assert_eq!(lines[0].text, "Hello");
    }

    #[test]
    fn test_parse_hundredths() {
        let lines = parse_synced("[01:02.50]Mid line");
        assert_eq!(lines[0].timestamp, Duration::from_millis(62500));
    }

    #[test]
    fn test_empty_text_discarded() {
        let input = "[00:05.00]First\n[00:07.00]   \n[00:09.00]\n[00:10.00]Second";
        let lines = parse_synced(input);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "First");
        assert_eq!(lines[1].text, "Second");
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let input = "[0:05.00]bad minutes\n[00:5.00]bad seconds\n[00:05.1]short frac\n[00:05]no frac\nno stamp at all\n[00:05.0000]long frac\n[00:06.00]ok";
        let lines = parse_synced(input);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "ok");
    }

    #[test]
    fn test_out_of_order_input_sorted() {
        let input = "[00:20.00]Later\n[00:10.00]Earlier";
        let lines = parse_synced(input);
        assert_eq!(lines[0].text, "Earlier");
        assert_eq!(lines[1].text, "Later");
    }

    #[test]
    fn test_sort_is_stable_for_equal_timestamps() {
        let input = "[00:10.00]First\n[00:10.00]Second";
        let lines = parse_synced(input);
        assert_eq!(lines[0].text, "First");
        assert_eq!(lines[1].text, "Second");
    }

    #[test]
    fn test_active_line_index() {
        let lines = parse_synced("[00:05.00]One\n[00:10.00]Two\n[00:15.00]Three");

        assert_eq!(active_line_index(&lines, Duration::from_secs(0)), None);
        assert_eq!(active_line_index(&lines, Duration::from_secs(5)), Some(0));
        assert_eq!(active_line_index(&lines, Duration::from_secs(7)), Some(0));
        assert_eq!(active_line_index(&lines, Duration::from_secs(12)), Some(1));
        assert_eq!(active_line_index(&lines, Duration::from_secs(60)), Some(2));
    }

    #[test]
    fn test_active_line_index_empty_transcript() {
        assert_eq!(active_line_index(&[], Duration::from_secs(10)), None);
    }

    #[test]
    fn test_active_line_index_monotonic() {
        let lines = parse_synced("[00:01.00]A\n[00:02.50]B\n[00:04.00]C\n[00:09.99]D");

        let mut last = None;
        for ms in (0..11_000).step_by(137) {
            let index = active_line_index(&lines, Duration::from_millis(ms));
            assert!(index >= last, "index went backwards at {ms}ms");
            last = index;
        }
        assert_eq!(last, Some(3));
    }

    #[test]
    fn test_parse_cjk_text() {
        let lines = parse_synced("[00:05.000]你好世界");
        assert_eq!(lines[0].text, "你好世界");
    }
}
