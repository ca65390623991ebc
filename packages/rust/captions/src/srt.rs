//! SubRip (`.srt`) parser and `.srt.sjson` writer.
//!
//! Each SubRip entry is:
//! - an index line (`1`, `2`, ...)
//! - a timing line, `HH:MM:SS,mmm --> HH:MM:SS,mmm` (colons also accepted before the millis)
//! - one or more text lines
//! - a blank line

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use coursepack_shared::{CoursepackError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parallel start/end/text sequences, the `.srt.sjson` document shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitles {
    /// Start times in milliseconds.
    pub start: Vec<u64>,
    /// End times in milliseconds.
    pub end: Vec<u64>,
    pub text: Vec<String>,
}

impl Subtitles {
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Serialize as pretty JSON with four-space indentation.
    pub fn to_sjson(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .map_err(|e| CoursepackError::parse(format!("failed to serialize subtitles: {e}")))?;
        String::from_utf8(buf).map_err(|e| CoursepackError::parse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

static INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("index regex"));

static TIMING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d\d:\d\d:\d\d:\d\d\d) --> (\d\d:\d\d:\d\d:\d\d\d)").expect("timing regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Index,
    Timing,
    Text,
}

/// Parse SubRip content into [`Subtitles`].
///
/// An unrecognized timing line is a hard error: the caption file is
/// considered corrupt rather than partially usable.
pub fn parse_srt(content: &str) -> Result<Subtitles> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut subs = Subtitles::default();
    let mut state = State::Index;
    let mut text = String::new();

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        match state {
            State::Index => {
                if INDEX_RE.is_match(line.trim()) {
                    state = State::Timing;
                }
            }
            State::Timing => {
                let (start, end) = parse_timing(line).ok_or_else(|| {
                    CoursepackError::parse(format!(
                        "unexpected subtitle timing at line {}: {line:?}",
                        lineno + 1
                    ))
                })?;
                subs.start.push(start);
                subs.end.push(end);
                text.clear();
                state = State::Text;
            }
            State::Text => {
                let line = line.trim();
                if line.is_empty() {
                    subs.text.push(text.trim_end().to_string());
                    state = State::Index;
                } else {
                    text.push_str(line);
                    text.push(' ');
                }
            }
        }
    }

    // Last entry without a closing blank line.
    if state == State::Text {
        subs.text.push(text.trim_end().to_string());
    }

    Ok(subs)
}

fn parse_timing(line: &str) -> Option<(u64, u64)> {
    let normalized;
    let caps = match TIMING_RE.captures(line) {
        Some(caps) => caps,
        None => {
            normalized = line.replace(',', ":");
            TIMING_RE.captures(&normalized)?
        }
    };
    Some((time_to_ms(&caps[1])?, time_to_ms(&caps[2])?))
}

/// Convert `HH:MM:SS:mmm` to milliseconds.
pub fn time_to_ms(stamp: &str) -> Option<u64> {
    let mut parts = stamp.split(':').map(|p| p.parse::<u64>().ok());
    let hours = parts.next()??;
    let minutes = parts.next()??;
    let seconds = parts.next()??;
    let millis = parts.next()??;
    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

// ---------------------------------------------------------------------------
// File conversion
// ---------------------------------------------------------------------------

/// Convert `<name>.srt` into `<name>.srt.sjson` next to it.
///
/// Returns `Ok(None)` (with a warning) for files without an `.srt` suffix.
pub fn convert_file(path: &Path) -> Result<Option<PathBuf>> {
    if path.extension().and_then(|e| e.to_str()) != Some("srt") {
        warn!(path = %path.display(), "not an srt file, skipping");
        return Ok(None);
    }

    let bytes = std::fs::read(path).map_err(|e| CoursepackError::io(path, e))?;
    let content = String::from_utf8_lossy(&bytes);
    let subs = parse_srt(&content)
        .map_err(|e| CoursepackError::parse(format!("{}: {e}", path.display())))?;

    let mut out = path.as_os_str().to_owned();
    out.push(".sjson");
    let out = PathBuf::from(out);
    std::fs::write(&out, subs.to_sjson()?).map_err(|e| CoursepackError::io(&out, e))?;

    info!(
        src = %path.display(),
        dest = %out.display(),
        entries = subs.len(),
        "converted subtitles"
    );
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures/srt/lecture.srt");
        std::fs::read_to_string(path).expect("read srt fixture")
    }

    #[test]
    fn fixture_matches_expected_sequences() {
        let subs = parse_srt(&fixture()).expect("parse");
        assert_eq!(subs.start, vec![1_000, 4_000, 9_000, 60_000, 3_600_000]);
        assert_eq!(subs.end, vec![4_000, 9_000, 15_000, 65_000, 3_603_000]);
        assert_eq!(
            subs.text,
            vec![
                "So, we'll get started.",
                "Today we look at the first law of thermodynamics.",
                "Energy is conserved.",
                "Write that down.",
                "See you next time.",
            ]
        );
    }

    #[test]
    fn sequences_are_parallel_and_ordered() {
        let subs = parse_srt(&fixture()).expect("parse");
        assert_eq!(subs.start.len(), subs.end.len());
        assert_eq!(subs.start.len(), subs.text.len());
        for (s, e) in subs.start.iter().zip(&subs.end) {
            assert!(s <= e);
        }
        assert!(subs.start.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn sjson_reparses_to_same_sequences() {
        let subs = parse_srt(&fixture()).expect("parse");
        let json = subs.to_sjson().expect("serialize");
        assert!(json.contains("\n    \"start\": ["));
        let back: Subtitles = serde_json::from_str(&json).expect("reparse");
        assert_eq!(back, subs);
    }

    #[test]
    fn millis_are_kept() {
        assert_eq!(time_to_ms("00:00:02:500"), Some(2_500));
        assert_eq!(time_to_ms("00:0x:02:500"), None);
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let srt = "\u{feff}1\r\n00:00:01,250 --> 00:00:02,000\r\nHello\r\n\r\n";
        let subs = parse_srt(srt).expect("parse");
        assert_eq!(subs.start, vec![1_250]);
        assert_eq!(subs.text, vec!["Hello"]);
    }

    #[test]
    fn bad_timing_line_is_fatal() {
        let srt = "1\n00:00:01.000 -> 00:00:02.000\nHello\n\n";
        let err = parse_srt(srt).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn convert_file_writes_sjson_next_to_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("abc.srt");
        std::fs::write(&src, fixture()).expect("write");

        let out = convert_file(&src).expect("convert").expect("srt converted");
        assert_eq!(out, dir.path().join("abc.srt.sjson"));
        let subs: Subtitles =
            serde_json::from_str(&std::fs::read_to_string(&out).expect("read")).expect("json");
        assert_eq!(subs.len(), 5);
    }

    #[test]
    fn non_srt_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("notes.txt");
        std::fs::write(&src, "hello").expect("write");
        assert_eq!(convert_file(&src).expect("skip"), None);
    }
}
