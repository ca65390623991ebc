//! Section page conversion: body content and media galleries to verticals.

use std::path::Path;
use std::sync::LazyLock;

use coursepack_shared::{HtmlModule, Module, Vertical};
use regex::Regex;
use scraper::ElementRef;
use tracing::{debug, error, info, warn};

use crate::classify::{LinkFragment, MatcherRegistry, is_navigation, resolve_local_pdf};
use crate::context::ConversionContext;
use crate::dom::{
    direct_text, element_children, element_descendants, find_by_id, find_tag, has_class,
    is_spacer_paragraph, parse_page, text_of,
};
use crate::pdf::pdf_module;
use crate::video::video_from_script;
use crate::xhtml::to_xhtml;

static CAPTION_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(/courses/[^ ]+\.srt)'").expect("valid regex"));

// ---------------------------------------------------------------------------
// Body children
// ---------------------------------------------------------------------------

/// What a direct child of a section body turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyChild {
    /// Shared navigation fragment, dropped.
    Navigation,
    /// Nested `<main>`/`<nav>` landmark, dropped.
    Landmark,
    /// Non-breaking-space paragraph, dropped.
    Spacer,
    /// `<blockquote>`, or a `<p>` holding exactly one link: each link gets its own vertical.
    Attachment,
    /// Table of PDF links: body text plus one vertical per PDF row.
    PdfTable,
    /// Anything else: appended to the introduction.
    Body,
}

impl BodyChild {
    pub fn of(el: ElementRef<'_>) -> Self {
        let name = el.value().name();
        if is_navigation(el) {
            Self::Navigation
        } else if matches!(name, "main" | "nav") {
            Self::Landmark
        } else if is_spacer_paragraph(el) {
            Self::Spacer
        } else if name == "blockquote" || (name == "p" && is_single_link(el)) {
            Self::Attachment
        } else if name == "div"
            && has_class(el, "maintabletemplate")
            && find_tag(el, "table").is_some()
        {
            Self::PdfTable
        } else {
            Self::Body
        }
    }
}

fn is_single_link(el: ElementRef<'_>) -> bool {
    let mut children = element_children(el);
    matches!(
        (children.next(), children.next()),
        (Some(only), None) if only.value().name() == "a"
    )
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// Convert a section's body region into verticals.
///
/// The introduction (all plain body content) comes first, then one vertical
/// per attachment link in document order, then one per PDF table row.
pub fn convert_body(
    region: ElementRef<'_>,
    title: &str,
    page_path: &Path,
    ctx: &mut ConversionContext,
    registry: &MatcherRegistry,
) -> Vec<Vertical> {
    let base_dir = page_path.parent().unwrap_or(Path::new(""));

    let mut children: Vec<ElementRef<'_>> = element_children(region).collect();
    if children.is_empty() {
        // Unclosed tags can leave the container empty with its content as siblings.
        children = region
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| {
                element_children(parent)
                    .filter(|c| matches!(c.value().name(), "p" | "div"))
                    .collect()
            })
            .unwrap_or_default();
        debug!(
            path = %page_path.display(),
            count = children.len(),
            "empty body region, using parent's paragraphs"
        );
    }

    let mut intro = String::new();
    let mut attachments = Vec::new();
    let mut tables = Vec::new();

    for child in children {
        match BodyChild::of(child) {
            BodyChild::Navigation | BodyChild::Landmark | BodyChild::Spacer => {}
            BodyChild::Attachment => {
                attachments.extend(attachment_verticals(child, base_dir, ctx, registry));
            }
            BodyChild::PdfTable => {
                intro.push_str(&to_xhtml(child, ctx));
                tables.push(child);
            }
            BodyChild::Body => intro.push_str(&to_xhtml(child, ctx)),
        }
    }

    let mut verticals = Vec::new();
    if intro.trim().is_empty() {
        debug!(title, "empty introduction dropped");
    } else {
        info!(title, "adding html introduction");
        verticals.push(Vertical {
            display_name: title.to_string(),
            modules: vec![Module::Html(HtmlModule {
                display_name: title.to_string(),
                markup: intro,
            })],
        });
    }
    verticals.extend(attachments);
    for table in tables {
        verticals.extend(pdf_table_verticals(table, base_dir, ctx));
    }
    verticals
}

fn attachment_verticals(
    el: ElementRef<'_>,
    base_dir: &Path,
    ctx: &mut ConversionContext,
    registry: &MatcherRegistry,
) -> Vec<Vertical> {
    let mut verticals = Vec::new();
    for anchor in element_descendants(el).filter(|e| e.value().name() == "a") {
        let label = text_of(anchor);
        if label.is_empty() {
            continue;
        }
        if ctx.options.is_skipped_label(&label) {
            debug!(label = %label, "skipping link");
            continue;
        }

        info!(display_name = %label, "vertical");
        let link = LinkFragment {
            anchor,
            label: &label,
            base_dir,
        };
        let modules = registry.classify(&link, ctx);
        if modules.is_empty() {
            debug!(display_name = %label, "no content for vertical, pruned");
            continue;
        }
        verticals.push(Vertical {
            display_name: label,
            modules,
        });
    }
    verticals
}

/// One vertical per table row whose link is a PDF.
///
/// Rows usually read `Session | Topic | Lecture N (PDF)`; the vertical is
/// named by the cell texts followed by the link text.
fn pdf_table_verticals(
    tablediv: ElementRef<'_>,
    base_dir: &Path,
    ctx: &mut ConversionContext,
) -> Vec<Vertical> {
    let Some(table) = find_tag(tablediv, "table") else {
        return Vec::new();
    };

    let mut verticals = Vec::new();
    let mut rows = 0;
    for tr in element_descendants(table).filter(|e| e.value().name() == "tr") {
        rows += 1;
        let cells: Vec<String> = element_children(tr)
            .filter(|td| td.value().name() == "td")
            .map(direct_text)
            .filter(|t| !t.is_empty())
            .collect();
        let Some(anchor) = find_tag(tr, "a") else {
            continue;
        };
        let href = anchor.value().attr("href").unwrap_or("").trim();
        if !href.to_lowercase().ends_with("pdf") {
            continue;
        }
        if cells.is_empty() {
            debug!(href, "PDF table row without text cells");
        }

        let title = format!("{} {}", cells.join(" "), text_of(anchor))
            .trim()
            .to_string();
        let Some(url) = resolve_local_pdf(ctx, base_dir, href) else {
            warn!(title = %title, href, "skipping PDF table row");
            continue;
        };
        let module = pdf_module(&title, &url, &mut ctx.assets);
        verticals.push(Vertical {
            display_name: title,
            modules: vec![module],
        });
    }

    info!(
        summary = table.value().attr("summary").unwrap_or(""),
        rows,
        added = verticals.len(),
        "found table of PDFs"
    );
    verticals
}

// ---------------------------------------------------------------------------
// Media gallery
// ---------------------------------------------------------------------------

/// Convert a media gallery region: one video vertical per media listing.
pub fn convert_media_gallery(region: ElementRef<'_>, ctx: &mut ConversionContext) -> Vec<Vertical> {
    let mut verticals = Vec::new();
    for child in element_children(region) {
        if has_class(child, "media_rss_link") || !has_class(child, "medialisting") {
            continue;
        }
        let Some(anchor) = element_descendants(child)
            .find(|e| e.value().name() == "a" && e.value().attr("href").is_some())
        else {
            warn!("media listing without a link");
            continue;
        };

        let page = ctx.page_for_href(anchor.value().attr("href").unwrap_or_default());
        if !ctx.mark_processed(&page) {
            info!(path = %page.display(), "already processed, skipping");
            continue;
        }

        let title = anchor
            .value()
            .attr("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| text_of(anchor));
        let display_name = format!("Video {title}");
        info!(display_name = %display_name, "vertical");

        match media_page_video(&page, &title, ctx) {
            Some(module) => verticals.push(Vertical {
                display_name,
                modules: vec![module],
            }),
            None => warn!(path = %page.display(), "no video found on media page"),
        }
    }
    verticals
}

/// The video on a media page: the first script carries the caption path,
/// the second the embed call.
fn media_page_video(path: &Path, title: &str, ctx: &ConversionContext) -> Option<Module> {
    let doc = match parse_page(path) {
        Ok(doc) => doc,
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read media page");
            return None;
        }
    };
    let Some(main) = find_by_id(doc.root_element(), "main", "course_inner_media") else {
        error!(path = %path.display(), "no course_inner_media on media page");
        return None;
    };

    let scripts: Vec<ElementRef<'_>> = element_descendants(main)
        .filter(|e| e.value().name() == "script")
        .collect();
    let Some(first) = scripts.first() else {
        error!(path = %path.display(), "no script on media page");
        return None;
    };

    let outer = first.html();
    let caption_hint = if outer.contains("caption_embed") {
        let hint = CAPTION_PATH_RE
            .captures(&outer)
            .map(|c| ctx.options.caption_url(&c[1]));
        if hint.is_none() {
            warn!(path = %path.display(), "caption embed without a caption path");
        }
        hint
    } else {
        warn!(path = %path.display(), "expected caption link in first script");
        None
    };

    let Some(embed) = scripts.get(1) else {
        error!(path = %path.display(), "no video script on media page");
        return None;
    };
    let text: String = embed.text().collect();
    video_from_script(title, &text, caption_hint, &ctx.options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MarkupOptions;
    use scraper::Html;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn body_verticals(root: &Path, html: &str) -> Vec<Vertical> {
        let mut ctx = ConversionContext::new(root, MarkupOptions::default());
        let doc = Html::parse_document(html);
        let region = find_by_id(doc.root_element(), "div", "parent-fieldname-text").unwrap();
        let page = root.join("contents/readings/index.htm");
        convert_body(region, "Readings", &page, &mut ctx, &MatcherRegistry::new())
    }

    #[test]
    fn body_children_are_classified() {
        let doc = Html::parse_document(
            r#"<body>
<p class="sc_nav">n</p><main></main><p>&nbsp;</p>
<p><a href="x.pdf">only link</a></p>
<p>text <a href="x.pdf">inline</a></p>
<blockquote><p>quoted</p></blockquote>
<div class="maintabletemplate"><table><tr><td>1</td></tr></table></div>
</body>"#,
        );
        let kinds: Vec<BodyChild> = element_children(find_tag(doc.root_element(), "body").unwrap())
            .map(BodyChild::of)
            .collect();
        assert_eq!(
            kinds,
            vec![
                BodyChild::Navigation,
                BodyChild::Landmark,
                BodyChild::Spacer,
                BodyChild::Attachment,
                BodyChild::Body,
                BodyChild::Attachment,
                BodyChild::PdfTable,
            ]
        );
    }

    #[test]
    fn intro_first_then_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let verticals = body_verticals(
            dir.path(),
            r#"<div id="parent-fieldname-text">
<p>Welcome to the readings.</p>
<blockquote><a href="https://example.org/book">Textbook</a> <a href="https://itunes.apple.com/x">iTunes U</a></blockquote>
<p><a href="http://www.youtube.com/watch?v=abc">Bonus video</a></p>
</div>"#,
        );
        let names: Vec<&str> = verticals.iter().map(|v| v.display_name.as_str()).collect();
        assert_eq!(names, vec!["Readings", "Textbook", "Bonus video"]);
        match &verticals[0].modules[..] {
            [Module::Html(h)] => assert_eq!(h.markup, "<p>Welcome to the readings.</p>"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_intro_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let verticals = body_verticals(
            dir.path(),
            r#"<div id="parent-fieldname-text"><p class="sc_nav">nav</p><p><a href="https://example.org">Only</a></p></div>"#,
        );
        assert_eq!(verticals.len(), 1);
        assert_eq!(verticals[0].display_name, "Only");
    }

    #[test]
    fn pdf_table_rows_become_pdf_verticals() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "contents/readings/lec1.pdf", "%PDF");
        write(dir.path(), "contents/readings/lec2.PDF", "%PDF");
        let verticals = body_verticals(
            dir.path(),
            r#"<div id="parent-fieldname-text">
<div class="maintabletemplate"><table summary="Lecture notes">
<thead><tr><th>SES #</th><th>TOPICS</th><th>NOTES</th></tr></thead>
<tbody>
<tr><td>1</td><td>The First Law</td><td><a href="../../contents/readings/lec1.pdf">Lecture 1 (PDF)</a></td></tr>
<tr><td>2</td><td>Entropy</td><td><a href="lec2.PDF">Lecture 2 (PDF)</a></td></tr>
<tr><td>3</td><td>Review</td><td>No notes</td></tr>
<tr><td>4</td><td>Missing</td><td><a href="gone.pdf">Lecture 4 (PDF)</a></td></tr>
</tbody></table></div>
</div>"#,
        );
        let names: Vec<&str> = verticals.iter().map(|v| v.display_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Readings",
                "1 The First Law Lecture 1 (PDF)",
                "2 Entropy Lecture 2 (PDF)",
            ]
        );
        assert!(matches!(&verticals[1].modules[..], [Module::Pdf(p)] if p.url == "/static/readings/lec1.pdf"));
        assert!(matches!(&verticals[2].modules[..], [Module::Pdf(p)] if p.url == "/static/readings/lec2.PDF"));
    }

    #[test]
    fn media_gallery_listings_become_video_verticals() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "contents/video-lectures/lecture-1/index.htm",
            r#"<html><body><main id="course_inner_media">
<script type="text/javascript">caption_embed('/courses/physics/8-01/lecture-1/lec1.srt')</script>
<script type="text/javascript">ocw_embed_chapter_media('embed1', 'http://www.youtube.com/v/vid1', 'lec1', 0, 0, null)</script>
</main></body></html>"#,
        );
        let mut ctx = ConversionContext::new(dir.path(), MarkupOptions::default());
        let doc = Html::parse_document(
            r#"<div id="course_inner_media_gallery">
<div class="media_rss_link"><a href="rss.xml">RSS</a></div>
<div class="medialisting"><a href="../../contents/video-lectures/lecture-1/index.htm" title="Lecture 1: Motion">L1</a></div>
<div class="medialisting"><a href="../../contents/video-lectures/lecture-1/index.htm" title="Lecture 1 again">L1</a></div>
</div>"#,
        );
        let region = find_by_id(doc.root_element(), "div", "course_inner_media_gallery").unwrap();

        let verticals = convert_media_gallery(region, &mut ctx);
        assert_eq!(verticals.len(), 1);
        assert_eq!(verticals[0].display_name, "Video Lecture 1: Motion");
        match &verticals[0].modules[..] {
            [Module::Video(v)] => {
                assert_eq!(v.youtube_id, "vid1");
                assert_eq!(v.display_name, "Video: Lecture 1: Motion");
                assert_eq!(
                    v.caption_url.as_deref(),
                    Some("https://ocw.mit.edu/courses/physics/8-01/lecture-1/lec1.srt")
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
