//! End-to-end `convert` pipeline: course dump → metadata → walk → export.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use coursepack_captions::{CaptionFetcher, FetchOptions};
use coursepack_markup::{ConversionContext, MarkupOptions};
use coursepack_shared::{ConversionSettings, Course, CourseStats, CoursepackError, Result};
use tracing::{info, instrument};

use crate::exporter::{ExportBundle, OutputTarget, export};
use crate::metadata::read_metadata;
use crate::policy::{about_files, build_policies};
use crate::source::CourseSource;
use crate::walker::{CourseWalker, register_course_image};

/// Configuration for one course conversion.
#[derive(Debug, Clone)]
pub struct ConvertCourseConfig {
    /// Course directory or `.zip` archive.
    pub input: PathBuf,
    /// Output path; its suffix selects the output form.
    /// Defaults to `<course id>_xbundle.xml`.
    pub output: Option<PathBuf>,
    pub settings: ConversionSettings,
}

/// Result of a finished conversion.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    pub course_id: String,
    pub title: String,
    pub output: PathBuf,
    pub stats: CourseStats,
    /// Number of static files copied into the output.
    pub static_files: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the walker starts a chapter (1-based).
    fn chapter(&self, name: &str, index: usize);
    /// Called when the walker starts a section.
    fn section(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &ConvertResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn chapter(&self, _name: &str, _index: usize) {}
    fn section(&self, _name: &str) {}
    fn done(&self, _result: &ConvertResult) {}
}

/// Convert one course dump.
///
/// 1. Open the input (extracting archives)
/// 2. Read metadata, build policies
/// 3. Walk the syllabus navigation, retrieving captions
/// 4. Export in the form selected by the output path
#[instrument(skip_all, fields(input = %config.input.display()))]
pub async fn convert_course(
    config: &ConvertCourseConfig,
    progress: &dyn ProgressReporter,
) -> Result<ConvertResult> {
    let start = Instant::now();
    let settings = &config.settings;

    progress.phase("Opening course");
    let source = CourseSource::open(&config.input)?;
    info!(root = %source.root().display(), "processing course");

    progress.phase("Reading metadata");
    let metadata = read_metadata(&source.metadata_path())?;
    let policies = build_policies(&metadata, &settings.semester)?;

    let options = MarkupOptions::from_settings(settings)?;
    let mut ctx = ConversionContext::new(source.root(), options);

    let scratch = tempfile::Builder::new()
        .prefix("coursepack-captions")
        .tempdir()
        .map_err(|e| CoursepackError::io(std::env::temp_dir(), e))?;
    let fetcher = CaptionFetcher::new(
        scratch.path(),
        &FetchOptions {
            timeout_secs: settings.caption_timeout_secs,
        },
    )?;

    progress.phase("Converting chapters");
    let chapters = CourseWalker::new(&mut ctx, Some(&fetcher), settings.include_media, progress)
        .walk(&source.syllabus_path())
        .await?;
    register_course_image(&source.home_path(), &mut ctx);
    info!(
        pages = ctx.processed_count(),
        static_files = ctx.assets.len(),
        "walk complete"
    );

    let course = Course {
        metadata,
        semester: settings.semester.clone(),
        org: settings.org.clone(),
        dirname: source.dirname(),
        chapters,
    };
    let about = about_files(&course.metadata, &settings.effort);

    progress.phase("Writing output");
    let output = config
        .output
        .clone()
        .unwrap_or_else(|| default_output(&course.metadata.course_id));
    let target = OutputTarget::from_path(output);
    let report = export(
        &ExportBundle {
            course: &course,
            policies: &policies,
            about: &about,
            assets: &ctx.assets,
        },
        &target,
    )?;

    let result = ConvertResult {
        course_id: course.metadata.course_id.clone(),
        title: course.metadata.title.clone(),
        output: report.path,
        stats: report.stats,
        static_files: report.static_files,
        elapsed: start.elapsed(),
    };
    info!(
        output = %result.output.display(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "conversion complete"
    );
    progress.done(&result);
    Ok(result)
}

/// `<course id>_xbundle.xml` in the working directory.
pub fn default_output(course_id: &str) -> PathBuf {
    PathBuf::from(format!("{course_id}_xbundle.xml"))
}
