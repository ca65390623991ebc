//! Link classification: turning one attachment link into output modules.
//!
//! Matchers are tried in priority order; [`NestedPageMatcher`] is the
//! always-last fallback.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use coursepack_shared::{HtmlModule, Module};
use path_clean::PathClean;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, error, info, warn};

use crate::assets::Resolved;
use crate::context::ConversionContext;
use crate::dom::{
    direct_text, element_children, element_descendants, find_by_id, find_tag, has_class,
    is_spacer_paragraph, parse_page, prev_element_sibling, robust_locate, text_of,
};
use crate::pdf::pdf_module;
use crate::video::{video_from_script, video_with_id, watch_id};
use crate::xhtml::{link_markup, to_xhtml_filtered, to_xhtml_verbatim};

/// Class names of shared navigation fragments repeated on every page.
pub const NAVIGATION_CLASSES: &[&str] = &["sc_nav", "sc_nav_bottom"];

/// Class names of `<div>`s wrapping an inline video player.
pub const VIDEO_EMBED_CLASSES: &[&str] = &["embedbg", "inline-video"];

static CONTENTS_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[./]+/contents/").expect("valid regex"));

// ---------------------------------------------------------------------------
// Fragment
// ---------------------------------------------------------------------------

/// An attachment link together with where it was found.
#[derive(Debug, Clone, Copy)]
pub struct LinkFragment<'a> {
    pub anchor: ElementRef<'a>,
    /// Display name of the vertical being filled.
    pub label: &'a str,
    /// Directory of the page containing the link.
    pub base_dir: &'a Path,
}

impl LinkFragment<'_> {
    pub fn href(&self) -> &str {
        self.anchor.value().attr("href").map(str::trim).unwrap_or("")
    }

    pub fn onclick(&self) -> &str {
        self.anchor.value().attr("onclick").unwrap_or("")
    }

    /// Link text, falling back to the vertical's label.
    pub fn title(&self) -> String {
        let text = text_of(self.anchor);
        if text.is_empty() {
            self.label.to_string()
        } else {
            text
        }
    }

    /// `href` without its fragment, lowercased, for suffix checks.
    fn target_name(&self) -> String {
        let href = self.href();
        href.split('#').next().unwrap_or(href).to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One rule of the link classifier.
pub trait LinkMatcher: Send + Sync {
    /// Whether this matcher handles the link.
    fn matches(&self, link: &LinkFragment<'_>) -> bool;

    /// Produce the modules for a matched link. May be empty.
    fn build(&self, link: &LinkFragment<'_>, ctx: &mut ConversionContext) -> Vec<Module>;

    /// Human-readable matcher name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds link matchers in priority order.
pub struct MatcherRegistry {
    matchers: Vec<Box<dyn LinkMatcher>>,
}

impl MatcherRegistry {
    /// Create a registry with all built-in matchers (nested page last).
    pub fn new() -> Self {
        Self {
            matchers: vec![
                Box::new(VideoPopupMatcher),
                Box::new(BareAnchorMatcher),
                Box::new(WatchLinkMatcher),
                Box::new(ExternalLinkMatcher),
                Box::new(PdfMatcher),
                Box::new(CaptionMatcher),
                Box::new(NestedPageMatcher),
            ],
        }
    }

    /// Classify `link` and build its modules.
    pub fn classify(&self, link: &LinkFragment<'_>, ctx: &mut ConversionContext) -> Vec<Module> {
        for matcher in &self.matchers {
            if matcher.matches(link) {
                debug!(matcher = matcher.name(), href = link.href(), "classified link");
                return matcher.build(link, ctx);
            }
        }
        // Unreachable: NestedPageMatcher always matches
        unreachable!("NestedPageMatcher must always match");
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Matchers
// ---------------------------------------------------------------------------

/// `<a onclick="...youtube.com...">`: a popup video player.
pub struct VideoPopupMatcher;

impl LinkMatcher for VideoPopupMatcher {
    fn matches(&self, link: &LinkFragment<'_>) -> bool {
        link.onclick().contains("youtube.com")
    }

    fn build(&self, link: &LinkFragment<'_>, ctx: &mut ConversionContext) -> Vec<Module> {
        video_from_script(&link.title(), link.onclick(), None, &ctx.options)
            .into_iter()
            .collect()
    }

    fn name(&self) -> &str {
        "video-popup"
    }
}

/// `<a>` without a target: kept as markup.
pub struct BareAnchorMatcher;

impl LinkMatcher for BareAnchorMatcher {
    fn matches(&self, link: &LinkFragment<'_>) -> bool {
        link.href().is_empty()
    }

    fn build(&self, link: &LinkFragment<'_>, _ctx: &mut ConversionContext) -> Vec<Module> {
        let markup = to_xhtml_verbatim(link.anchor);
        error!(markup = %markup, "missing link target in content");
        vec![Module::Html(HtmlModule {
            display_name: link.label.to_string(),
            markup,
        })]
    }

    fn name(&self) -> &str {
        "bare-anchor"
    }
}

/// `https://www.youtube.com/watch?v=<id>`.
pub struct WatchLinkMatcher;

impl LinkMatcher for WatchLinkMatcher {
    fn matches(&self, link: &LinkFragment<'_>) -> bool {
        watch_id(link.href()).is_some()
    }

    fn build(&self, link: &LinkFragment<'_>, ctx: &mut ConversionContext) -> Vec<Module> {
        watch_id(link.href())
            .map(|id| video_with_id(&link.title(), id, &ctx.options))
            .into_iter()
            .collect()
    }

    fn name(&self) -> &str {
        "watch-link"
    }
}

/// Absolute URL: kept as a plain link, nothing copied.
pub struct ExternalLinkMatcher;

impl LinkMatcher for ExternalLinkMatcher {
    fn matches(&self, link: &LinkFragment<'_>) -> bool {
        let href = link.href();
        href.starts_with("http://") || href.starts_with("https://")
    }

    fn build(&self, link: &LinkFragment<'_>, _ctx: &mut ConversionContext) -> Vec<Module> {
        let text = text_of(link.anchor);
        info!(text = %text, href = link.href(), "external link");
        vec![Module::Html(HtmlModule {
            display_name: link.label.to_string(),
            markup: link_markup(link.href(), &text),
        })]
    }

    fn name(&self) -> &str {
        "external"
    }
}

/// Local `.pdf`: shown through the viewer.
pub struct PdfMatcher;

impl LinkMatcher for PdfMatcher {
    fn matches(&self, link: &LinkFragment<'_>) -> bool {
        link.target_name().ends_with(".pdf")
    }

    fn build(&self, link: &LinkFragment<'_>, ctx: &mut ConversionContext) -> Vec<Module> {
        resolve_local_pdf(ctx, link.base_dir, link.href())
            .map(|url| pdf_module(link.label, &url, &mut ctx.assets))
            .into_iter()
            .collect()
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// Local `.srt`: captions belong to videos, never standalone.
pub struct CaptionMatcher;

impl LinkMatcher for CaptionMatcher {
    fn matches(&self, link: &LinkFragment<'_>) -> bool {
        link.target_name().ends_with(".srt")
    }

    fn build(&self, link: &LinkFragment<'_>, _ctx: &mut ConversionContext) -> Vec<Module> {
        debug!(href = link.href(), "skipping standalone caption link");
        Vec::new()
    }

    fn name(&self) -> &str {
        "caption"
    }
}

/// Anything else: a nested course page converted to markup and videos.
/// Always matches as the lowest-priority fallback.
pub struct NestedPageMatcher;

impl LinkMatcher for NestedPageMatcher {
    fn matches(&self, _link: &LinkFragment<'_>) -> bool {
        true
    }

    fn build(&self, link: &LinkFragment<'_>, ctx: &mut ConversionContext) -> Vec<Module> {
        let path = local_target(ctx, link.base_dir, link.href());
        let doc = match parse_page(&path) {
            Ok(doc) => doc,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read linked page");
                return Vec::new();
            }
        };
        convert_nested_page(&doc, &path, link.label, ctx)
    }

    fn name(&self) -> &str {
        "nested-page"
    }
}

// ---------------------------------------------------------------------------
// Nested pages
// ---------------------------------------------------------------------------

/// Convert a linked content page into one Html module plus its inline videos.
pub fn convert_nested_page(
    doc: &Html,
    path: &Path,
    label: &str,
    ctx: &mut ConversionContext,
) -> Vec<Module> {
    let root = doc.root_element();
    let region = find_by_id(root, "div", "parent-fieldname-text")
        .or_else(|| robust_locate(root, "course_inner_section", path));
    let Some(region) = region else {
        error!(path = %path.display(), "no content region in linked page");
        return Vec::new();
    };

    let kept: Vec<ElementRef<'_>> = element_children(region)
        .filter(|child| !is_navigation(*child) && !is_spacer_paragraph(*child))
        .collect();

    let mut markup = String::new();
    for child in &kept {
        markup.push_str(&to_xhtml_filtered(*child, ctx, &is_video_embed));
    }

    let mut modules = Vec::new();
    if !markup.trim().is_empty() {
        modules.push(Module::Html(HtmlModule {
            display_name: label.to_string(),
            markup,
        }));
    }

    for class in VIDEO_EMBED_CLASSES {
        let embeds = kept
            .iter()
            .flat_map(|child| std::iter::once(*child).chain(element_descendants(*child)))
            .filter(|el| el.value().name() == "div" && has_class(*el, class));
        for embed in embeds {
            let Some(script) = find_tag(embed, "script") else {
                warn!(path = %path.display(), class, "video embed without a script");
                continue;
            };
            let title = embed_title(embed, label);
            let text: String = script.text().collect();
            modules.extend(video_from_script(&title, &text, None, &ctx.options));
        }
    }

    modules
}

/// Title for an inline video: the preceding sibling's text, else the vertical's.
fn embed_title(embed: ElementRef<'_>, fallback: &str) -> String {
    match prev_element_sibling(embed) {
        None => fallback.to_string(),
        Some(prev) => {
            let title = direct_text(prev);
            if title.is_empty() {
                warn!(fallback, "missing title for video, using vertical name");
                fallback.to_string()
            } else {
                title
            }
        }
    }
}

pub fn is_navigation(el: ElementRef<'_>) -> bool {
    NAVIGATION_CLASSES.iter().any(|c| has_class(el, c))
}

/// A video embed `<div>` that will become its own Video module.
pub fn is_video_embed(el: ElementRef<'_>) -> bool {
    el.value().name() == "div"
        && VIDEO_EMBED_CLASSES.iter().any(|c| has_class(el, c))
        && find_tag(el, "script").is_some()
}

// ---------------------------------------------------------------------------
// Local targets
// ---------------------------------------------------------------------------

/// Local file a content link points at.
///
/// `.../contents/` prefixes are collapsed onto the course root; otherwise the
/// link is taken relative to the page containing it.
pub fn local_target(ctx: &ConversionContext, base_dir: &Path, href: &str) -> PathBuf {
    let href = href.split('#').next().unwrap_or(href);
    let collapsed = CONTENTS_PREFIX_RE.replace_all(href, "contents/");
    let candidate = ctx.course_dir.join(collapsed.as_ref()).clean();
    if candidate.exists() {
        return candidate;
    }
    base_dir.join(href).clean()
}

/// `/static/...` URL for a linked PDF, registering it for copying.
pub(crate) fn resolve_local_pdf(
    ctx: &mut ConversionContext,
    base_dir: &Path,
    href: &str,
) -> Option<String> {
    let target = local_target(ctx, base_dir, href);
    let Ok(relative) = target.strip_prefix(&ctx.course_dir) else {
        warn!(href, target = %target.display(), "PDF link points outside the course");
        return None;
    };
    let reference = format!("../{}", relative.to_string_lossy().replace('\\', "/"));
    match ctx.assets.resolve(&reference) {
        Resolved::Static(url) => {
            info!(href, url = %url, "pdf link");
            Some(url)
        }
        Resolved::Missing => None,
        Resolved::Unrecognized => {
            warn!(href, "cannot place PDF in static namespace");
            None
        }
    }
}
