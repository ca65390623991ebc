//! Per-conversion state shared by the walker and the markup converters.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use coursepack_shared::{ConversionSettings, CoursepackError, Result};
use path_clean::PathClean;
use regex::Regex;

use crate::assets::StaticAssets;

/// Markup rewriting rules, compiled from [`ConversionSettings`].
#[derive(Debug, Clone)]
pub struct MarkupOptions {
    /// Start offset (seconds) for videos without an extracted trim.
    pub default_start_offset: u32,
    /// Root for caption paths that are not absolute URLs.
    pub caption_host: String,
    /// Script `src` patterns, anchored at the start.
    pub dropped_scripts: Vec<Regex>,
    /// Attachment labels containing any of these are skipped.
    pub skipped_link_labels: Vec<String>,
}

impl MarkupOptions {
    pub fn from_settings(settings: &ConversionSettings) -> Result<Self> {
        let dropped_scripts = settings
            .dropped_scripts
            .iter()
            .map(|pat| {
                Regex::new(&format!("^(?:{pat})")).map_err(|e| {
                    CoursepackError::config(format!("invalid dropped script pattern {pat:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            default_start_offset: settings.video_start_offset,
            caption_host: settings.caption_host.trim_end_matches('/').to_string(),
            dropped_scripts,
            skipped_link_labels: settings.skipped_link_labels.clone(),
        })
    }

    pub fn is_dropped_script(&self, src: &str) -> bool {
        self.dropped_scripts.iter().any(|re| re.is_match(src))
    }

    pub fn is_skipped_label(&self, label: &str) -> bool {
        self.skipped_link_labels
            .iter()
            .any(|skip| label.contains(skip.as_str()))
    }

    /// Absolute caption URL for a path found in course markup.
    pub fn caption_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{path}", self.caption_host)
        }
    }
}

impl Default for MarkupOptions {
    fn default() -> Self {
        // The built-in patterns are known to compile.
        Self::from_settings(&ConversionSettings::default()).unwrap_or_else(|_| Self {
            default_start_offset: 0,
            caption_host: String::new(),
            dropped_scripts: Vec::new(),
            skipped_link_labels: Vec::new(),
        })
    }
}

/// State owned by a single conversion run.
///
/// Holds the static asset mapping and the set of already-converted pages,
/// both of which only grow during the walk.
#[derive(Debug)]
pub struct ConversionContext {
    pub course_dir: PathBuf,
    pub assets: StaticAssets,
    pub options: MarkupOptions,
    processed: HashSet<PathBuf>,
}

impl ConversionContext {
    pub fn new(course_dir: impl Into<PathBuf>, options: MarkupOptions) -> Self {
        let course_dir: PathBuf = course_dir.into();
        let course_dir = course_dir.clean();
        Self {
            assets: StaticAssets::new(&course_dir),
            course_dir,
            options,
            processed: HashSet::new(),
        }
    }

    /// Record `path` as converted. Returns `false` if it already was.
    pub fn mark_processed(&mut self, path: &Path) -> bool {
        self.processed.insert(path.clean())
    }

    pub fn is_processed(&self, path: &Path) -> bool {
        self.processed.contains(&path.clean())
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Local file for a navigation or media-listing `href`.
    ///
    /// Every `../../` is dropped first; if that names no file, every `../`.
    pub fn page_for_href(&self, href: &str) -> PathBuf {
        let candidate = self.course_dir.join(href.replace("../../", ""));
        if candidate.exists() {
            return candidate.clean();
        }
        self.course_dir.join(href.replace("../", "")).clean()
    }
}
