//! Syllabus navigation walk: chapters, sections and their content.
//!
//! The walk is strictly sequential. Each section page is converted
//! synchronously and its parsed document dropped before the captions its
//! videos reference are retrieved.

use std::path::Path;

use coursepack_captions::CaptionFetcher;
use coursepack_markup::dom::{element_descendants, find_by_id, find_tag, text_of};
use coursepack_markup::{
    ConversionContext, MatcherRegistry, convert_body, convert_media_gallery, parse_page,
    robust_locate,
};
use coursepack_shared::{Chapter, CoursepackError, Module, Result, Sequential, Vertical};
use path_clean::PathClean;
use scraper::ElementRef;
use tracing::{debug, error, info, instrument, warn};

use crate::pipeline::ProgressReporter;

/// Chapter title that only links back to the course home page.
const COURSE_HOME: &str = "Course Home";

/// Static destination of the course image.
pub const COURSE_IMAGE_DEST: &str = "static/images/course_image.jpg";

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// A chapter entry of the syllabus navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavChapter {
    pub name: String,
    pub links: Vec<NavLink>,
}

/// A section link inside a chapter entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

/// Read the chapter list from the syllabus page.
///
/// A page without a `course_nav` container is a [`CoursepackError::Navigation`]
/// error: nothing can be converted without it.
pub fn read_navigation(syllabus: &Path) -> Result<Vec<NavChapter>> {
    let doc = parse_page(syllabus)?;
    let root = doc.root_element();

    let container = find_by_id(root, "div", "course_nav")
        .or_else(|| find_by_id(root, "nav", "course_nav"))
        .ok_or_else(|| CoursepackError::Navigation {
            path: syllabus.to_path_buf(),
        })?;
    let list = container
        .children()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "ul")
        .or_else(|| find_tag(container, "ul"))
        .ok_or_else(|| CoursepackError::Navigation {
            path: syllabus.to_path_buf(),
        })?;

    let chapters = list
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "li")
        .filter_map(nav_chapter)
        .collect::<Vec<_>>();
    debug!(count = chapters.len(), "navigation chapters");
    Ok(chapters)
}

fn nav_chapter(li: ElementRef<'_>) -> Option<NavChapter> {
    let links: Vec<NavLink> = element_descendants(li)
        .filter(|e| e.value().name() == "a")
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if href.is_empty() || href == "#" {
                return None;
            }
            Some(NavLink {
                label: text_of(a),
                href: href.to_string(),
            })
        })
        .collect();
    let name = links.first()?.label.clone();
    Some(NavChapter { name, links })
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Converts the navigation hierarchy into the chapter tree.
pub struct CourseWalker<'a> {
    ctx: &'a mut ConversionContext,
    registry: MatcherRegistry,
    captions: Option<&'a CaptionFetcher>,
    include_media: bool,
    progress: &'a dyn ProgressReporter,
}

impl<'a> CourseWalker<'a> {
    pub fn new(
        ctx: &'a mut ConversionContext,
        captions: Option<&'a CaptionFetcher>,
        include_media: bool,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            ctx,
            registry: MatcherRegistry::new(),
            captions,
            include_media,
            progress,
        }
    }

    /// Walk every chapter of the syllabus at `syllabus`.
    #[instrument(skip_all, fields(syllabus = %syllabus.display()))]
    pub async fn walk(&mut self, syllabus: &Path) -> Result<Vec<Chapter>> {
        let navigation = read_navigation(syllabus)?;
        self.ctx.mark_processed(syllabus);

        let mut chapters = Vec::new();
        for nav in navigation {
            if nav.name == COURSE_HOME {
                debug!("skipping course home entry");
                continue;
            }
            info!(chapter = %nav.name, "chapter");
            self.progress.chapter(&nav.name, chapters.len() + 1);

            let mut sequentials = Vec::new();
            for link in &nav.links {
                let page = self.ctx.page_for_href(&link.href);
                if self.ctx.is_processed(&page) {
                    info!(path = %page.display(), "already processed, skipping");
                    continue;
                }
                info!(section = %link.label, "section");
                self.progress.section(&link.label);

                let mut sequential = self.convert_section(&page, &link.label);
                self.attach_captions(&mut sequential).await;
                sequentials.push(sequential);
            }

            chapters.push(Chapter {
                display_name: nav.name,
                sequentials,
            });
        }
        Ok(chapters)
    }

    /// Convert one section page into a sequential named `label`.
    pub fn convert_section(&mut self, page: &Path, label: &str) -> Sequential {
        self.ctx.mark_processed(page);
        let mut sequential = Sequential {
            display_name: label.to_string(),
            verticals: Vec::new(),
        };

        info!(path = %page.display(), "reading section");
        let doc = match parse_page(page) {
            Ok(doc) => doc,
            Err(e) => {
                error!(path = %page.display(), error = %e, "cannot read section page");
                return sequential;
            }
        };
        let root = doc.root_element();

        let title = find_by_id(root, "span", "parent-fieldname-title")
            .map(text_of)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| label.to_string());

        let mut found = false;
        let body = find_by_id(root, "div", "parent-fieldname-text")
            .or_else(|| robust_locate(root, "course_inner_section", page));
        if let Some(region) = body {
            found = true;
            sequential.verticals.extend(convert_body(
                region,
                &title,
                page,
                self.ctx,
                &self.registry,
            ));
        }

        if self.include_media {
            if let Some(region) = robust_locate(root, "course_inner_media_gallery", page) {
                found = true;
                sequential
                    .verticals
                    .extend(convert_media_gallery(region, self.ctx));
            }
        }

        if !found {
            warn!(
                path = %page.display(),
                "no section body or media gallery found"
            );
        }
        sequential
    }

    /// Retrieve the captions of every video in `sequential`.
    ///
    /// Failures are logged; the video keeps its caption URL without subtitles.
    async fn attach_captions(&mut self, sequential: &mut Sequential) {
        let Some(fetcher) = self.captions else {
            return;
        };
        let videos = sequential
            .verticals
            .iter_mut()
            .flat_map(|v: &mut Vertical| v.modules.iter_mut())
            .filter_map(|m| match m {
                Module::Video(video) => Some(video),
                _ => None,
            });

        for video in videos {
            let Some(url) = video.caption_url.as_deref() else {
                continue;
            };
            match fetcher.fetch(url, Some(&video.youtube_id)).await {
                Ok(asset) => {
                    info!(
                        caption = %asset.sjson_path.display(),
                        dest = %asset.static_path,
                        "got caption file"
                    );
                    self.ctx
                        .assets
                        .register(asset.sjson_path, asset.static_path);
                    video.subtitles_id = Some(video.youtube_id.clone());
                }
                Err(e) => {
                    error!(url, youtube_id = %video.youtube_id, error = %e, "failed to retrieve captions");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Course image
// ---------------------------------------------------------------------------

/// Register the course image shown on the home page. Failures are logged.
pub fn register_course_image(home: &Path, ctx: &mut ConversionContext) -> bool {
    let doc = match parse_page(home) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %home.display(), error = %e, "cannot read course home page");
            return false;
        }
    };
    let Some(region) = robust_locate(doc.root_element(), "course_inner_chp", home) else {
        warn!(path = %home.display(), "no course_inner_chp on home page");
        return false;
    };
    let Some(src) = element_descendants(region)
        .find(|e| e.value().name() == "img" && e.value().attr("itemprop") == Some("image"))
        .and_then(|img| img.value().attr("src"))
    else {
        warn!(path = %home.display(), "no course image on home page");
        return false;
    };

    let source = ctx.course_dir.join(src.trim_start_matches("../")).clean();
    if !source.is_file() {
        warn!(src, path = %source.display(), "course image file is missing");
        return false;
    }
    info!(path = %source.display(), "course image");
    ctx.assets.register(source, COURSE_IMAGE_DEST);
    true
}
