//! Lyrics parsing and playback-time lookup.
//!
//! LRC input becomes `(time, text)` pairs sorted by time; plain input keeps
//! every non-empty line with its line index as an ordinal position. The
//! active-line lookup is a backward linear scan, recomputed on every time
//! update, which is cheap enough for per-frame polling over a few hundred
//! lines.

use serde::Serialize;

pub const LRC_FORMAT: &str = "lrc";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LyricLine {
    /// Seconds for LRC lyrics; the zero-based line index for plain lyrics.
    pub time: f64,
    pub text: String,
}

/// Parses raw lyrics according to the stored format tag. Anything other than
/// `"lrc"` is treated as plain text.
pub fn parse_lyrics(raw: &str, lyrics_type: Option<&str>) -> Vec<LyricLine> {
    match lyrics_type {
        Some(LRC_FORMAT) => parse_lrc(raw),
        _ => parse_plain(raw),
    }
}

/// Greatest index whose time is at or before `time_secs`, or `None` when the
/// playhead is before the first line (or there are no lines).
pub fn active_line(lines: &[LyricLine], time_secs: f64) -> Option<usize> {
    for (index, line) in lines.iter().enumerate().rev() {
        if line.time <= time_secs {
            return Some(index);
        }
    }
    None
}

fn parse_lrc(raw: &str) -> Vec<LyricLine> {
    let mut lines: Vec<LyricLine> = Vec::new();
    for line in raw.lines() {
        // Non-matching lines (metadata tags, garbage) are skipped silently.
        let Some((time, text)) = parse_lrc_line(line) else {
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        lines.push(LyricLine {
            time,
            text: text.to_string(),
        });
    }
    // Source order is not trusted.
    lines.sort_by(|a, b| a.time.total_cmp(&b.time));
    lines
}

fn parse_plain(raw: &str) -> Vec<LyricLine> {
    raw.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, text)| LyricLine {
            time: index as f64,
            text: text.to_string(),
        })
        .collect()
}

/// Matches `[mm:ss.ff]text` / `[mm:ss.fff]text`: two-digit minutes and
/// seconds, a 2-3 digit fraction. A 2-digit fraction is right-padded before
/// being read as milliseconds, so `[00:00.5]` never parses but `[00:00.50]`
/// and `[00:00.500]` agree.
fn parse_lrc_line(line: &str) -> Option<(f64, &str)> {
    let rest = line.strip_prefix('[')?;
    let (minutes, rest) = take_digits(rest, 2)?;
    let rest = rest.strip_prefix(':')?;
    let (seconds, rest) = take_digits(rest, 2)?;
    let rest = rest.strip_prefix('.')?;
    let (fraction, rest) = take_fraction(rest)?;
    let text = rest.strip_prefix(']')?;

    let millis = match fraction.len() {
        2 => fraction.parse::<u64>().ok()? * 10,
        3 => fraction.parse::<u64>().ok()?,
        _ => return None,
    };
    let time = f64::from(minutes) * 60.0 + f64::from(seconds) + millis as f64 / 1000.0;
    Some((time, text))
}

fn take_digits(input: &str, count: usize) -> Option<(u32, &str)> {
    if input.len() < count || !input.as_bytes()[..count].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value = input[..count].parse().ok()?;
    Some((value, &input[count..]))
}

/// Takes 2 or 3 fraction digits, longest match first.
fn take_fraction(input: &str) -> Option<(&str, &str)> {
    let digits = input
        .as_bytes()
        .iter()
        .take(3)
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits < 2 {
        return None;
    }
    Some((&input[..digits], &input[digits..]))
}

#[cfg(test)]
mod tests {
    use super::{active_line, parse_lyrics, LyricLine};

    #[test]
    fn lrc_line_parses_minutes_seconds_fraction() {
        let lines = parse_lyrics("[01:02.50]Hello", Some("lrc"));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].time, 62.5);
        assert_eq!(lines[0].text, "Hello");
    }

    #[test]
    fn two_digit_fraction_pads_to_milliseconds() {
        let short = parse_lyrics("[00:10.50]x", Some("lrc"));
        let long = parse_lyrics("[00:10.500]x", Some("lrc"));
        assert_eq!(short[0].time, long[0].time);

        // A single fraction digit does not match.
        assert!(parse_lyrics("[00:00.5]x", Some("lrc")).is_empty());
    }

    #[test]
    fn lrc_skips_nonmatching_and_empty_lines() {
        let raw = "[ti:Some Title]\n[00:01.00]first\n\nnot a timestamp\n[00:02.00]   \n[00:03.00]second";
        let lines = parse_lyrics(raw, Some("lrc"));
        assert_eq!(
            lines,
            vec![
                LyricLine {
                    time: 1.0,
                    text: "first".to_string()
                },
                LyricLine {
                    time: 3.0,
                    text: "second".to_string()
                },
            ]
        );
    }

    #[test]
    fn lrc_output_is_sorted_by_time() {
        let raw = "[00:30.00]later\n[00:10.00]earlier\n[00:20.00]middle";
        let lines = parse_lyrics(raw, Some("lrc"));
        let times: Vec<f64> = lines.iter().map(|l| l.time).collect();
        assert_eq!(times, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn plain_lines_use_index_as_ordinal() {
        let lines = parse_lyrics("one\n\n  two  \nthree", None);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].time, 0.0);
        assert_eq!(lines[1].text, "two");
        assert_eq!(lines[2].time, 2.0);
    }

    #[test]
    fn unknown_format_is_treated_as_plain() {
        let lines = parse_lyrics("[00:01.00]tagged", Some("txt"));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "[00:01.00]tagged");
    }

    #[test]
    fn active_line_picks_greatest_time_at_or_before() {
        let lines = parse_lyrics("[00:10.00]a\n[00:20.00]b\n[00:30.00]c", Some("lrc"));
        assert_eq!(active_line(&lines, 0.0), None);
        assert_eq!(active_line(&lines, 10.0), Some(0));
        assert_eq!(active_line(&lines, 19.99), Some(0));
        assert_eq!(active_line(&lines, 20.0), Some(1));
        assert_eq!(active_line(&lines, 99.0), Some(2));
        assert_eq!(active_line(&[], 5.0), None);
    }

    #[test]
    fn active_line_is_monotonic_over_increasing_time() {
        let lines = parse_lyrics(
            "[00:05.00]a\n[00:07.50]b\n[00:12.00]c\n[01:00.00]d",
            Some("lrc"),
        );
        let mut last: Option<usize> = None;
        let mut t = 0.0;
        while t < 90.0 {
            let index = active_line(&lines, t);
            assert!(index >= last, "regressed at t={}", t);
            last = index;
            t += 0.25;
        }
        assert_eq!(last, Some(3));
    }
}
