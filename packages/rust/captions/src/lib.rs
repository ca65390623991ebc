//! Subtitle conversion and caption retrieval.
//!
//! Course videos reference SubRip (`.srt`) captions hosted remotely. The
//! output package wants them as `.srt.sjson`: three parallel arrays of start
//! times, end times, and caption text. [`CaptionFetcher`] downloads a
//! caption, [`convert_file`] rewrites it.

mod fetch;
mod srt;

pub use fetch::{CaptionAsset, CaptionFetcher, FetchOptions};
pub use srt::{Subtitles, convert_file, parse_srt, time_to_ms};
