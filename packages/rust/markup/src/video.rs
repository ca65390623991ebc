//! Video embed extraction.
//!
//! Course pages embed hosted videos through a handful of JavaScript helper
//! calls. All of them share one shape, `name(..., start, end, caption)`,
//! so a single parameterized pattern is tried against the known helper
//! names in order.

use std::sync::LazyLock;

use coursepack_shared::{Module, VideoModule};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::context::MarkupOptions;

static YOUTUBE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?youtube(?:-nocookie)?\.com/(?:v|embed)/([A-Za-z0-9_-]+)")
        .expect("valid regex")
});

static WATCH_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?youtube\.com/watch\?(?:.*&)?v=([A-Za-z0-9_-]+)")
        .expect("valid regex")
});

/// Known embed helpers. The catch-all must be followed by `);`.
const CALL_SIGNATURES: &[(&str, bool)] = &[
    ("load_multiple_media_chapter", false),
    ("scholar_video_popup", false),
    ("ocw_embed_chapter_media", false),
    ("[a-z]+", true),
];

static CALL_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    CALL_SIGNATURES
        .iter()
        .map(|(name, terminated)| {
            let terminator = if *terminated { r"\);" } else { r"\)" };
            Regex::new(&format!(
                r#"{name}\(.*,\s*([ 0-9]+),\s*([ 0-9]+),\s*(null|.*\.srt['"]){terminator}"#
            ))
            .expect("valid call signature regex")
        })
        .collect()
});

/// Parameters recovered from an embed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedCall {
    /// Start offset, set only when the end offset is non-zero.
    pub start: Option<u32>,
    pub end: Option<u32>,
    /// Absolute caption URL.
    pub caption_url: Option<String>,
}

/// Hosted video id from a `/v/<id>` or `/embed/<id>` URL inside `text`.
pub fn youtube_id(text: &str) -> Option<String> {
    YOUTUBE_ID_RE.captures(text).map(|c| c[1].to_string())
}

/// Hosted video id from a `watch?v=<id>` link.
pub fn watch_id(href: &str) -> Option<String> {
    WATCH_ID_RE.captures(href).map(|c| c[1].to_string())
}

/// Match `text` against the known call signatures, first match wins.
pub fn parse_embed_call(text: &str, opts: &MarkupOptions) -> Option<EmbedCall> {
    let caps = CALL_RES.iter().find_map(|re| re.captures(text))?;
    let start: u32 = caps[1].trim().parse().ok()?;
    let end: u32 = caps[2].trim().parse().ok()?;

    let caption_url = match &caps[3] {
        "null" => None,
        quoted => {
            let path = quoted.trim_matches(|c| c == '\'' || c == '"');
            Some(opts.caption_url(path))
        }
    };

    let (start, end) = if end != 0 {
        (Some(start), Some(end))
    } else {
        (None, None)
    };

    Some(EmbedCall {
        start,
        end,
        caption_url,
    })
}

/// Build a Video module from an embed handler or script body.
///
/// `caption_hint` is used when the call itself names no caption. Returns
/// `None` (logged) when no video id can be found.
pub fn video_from_script(
    title: &str,
    text: &str,
    caption_hint: Option<String>,
    opts: &MarkupOptions,
) -> Option<Module> {
    let Some(id) = youtube_id(text) else {
        warn!(title, "cannot find video id in embed, skipping video");
        debug!(text, "embed text");
        return None;
    };
    Some(build(title, id, parse_embed_call(text, opts), caption_hint, opts))
}

/// Build a Video module for a known id with default trim and no captions.
pub fn video_with_id(title: &str, id: String, opts: &MarkupOptions) -> Module {
    build(title, id, None, None, opts)
}

fn build(
    title: &str,
    youtube_id: String,
    call: Option<EmbedCall>,
    caption_hint: Option<String>,
    opts: &MarkupOptions,
) -> Module {
    let mut start_offset = opts.default_start_offset;
    let mut end_offset = None;
    let mut caption_url = caption_hint;

    match call {
        Some(call) => {
            if let (Some(start), Some(end)) = (call.start, call.end) {
                start_offset = start;
                end_offset = Some(end);
            }
            if call.caption_url.is_some() {
                caption_url = call.caption_url;
            }
        }
        None if caption_url.is_none() => debug!(title, "no caption found for video"),
        None => {}
    }

    info!(youtube_id = %youtube_id, title, "video");
    Module::Video(VideoModule {
        display_name: format!("Video: {title}"),
        youtube_id,
        start_offset,
        end_offset,
        caption_url,
        subtitles_id: None,
    })
}
