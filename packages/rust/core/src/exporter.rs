//! Writing the converted course in the form chosen by the output path.

use std::fs::File;
use std::path::{Path, PathBuf};

use coursepack_markup::StaticAssets;
use coursepack_shared::{Course, CourseStats, CoursepackError, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, info, instrument, warn};

use crate::olx::{OlxFile, directory_files, render_xbundle};
use crate::policy::{AboutFile, Policies};

/// Output form, chosen purely by the output path's suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// `*.xml`: a single xbundle document, static files beside it.
    Document(PathBuf),
    /// `*.tar.gz` / `*.tgz`: the directory form packed under `course/`.
    Archive(PathBuf),
    /// Anything else: a course directory.
    Directory(PathBuf),
}

impl OutputTarget {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.to_string_lossy();
        if name.ends_with(".xml") {
            Self::Document(path)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Self::Archive(path)
        } else {
            Self::Directory(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Document(p) | Self::Archive(p) | Self::Directory(p) => p,
        }
    }
}

/// Everything the exporter writes.
#[derive(Debug, Clone, Copy)]
pub struct ExportBundle<'a> {
    pub course: &'a Course,
    pub policies: &'a Policies,
    pub about: &'a [AboutFile],
    pub assets: &'a StaticAssets,
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub stats: CourseStats,
    pub static_files: usize,
}

/// Write `bundle` to `target`.
#[instrument(skip_all, fields(output = %target.path().display()))]
pub fn export(bundle: &ExportBundle<'_>, target: &OutputTarget) -> Result<ExportReport> {
    let stats = CourseStats::from_course(bundle.course);
    info!(
        chapters = stats.chapters,
        sequentials = stats.sequentials,
        verticals = stats.verticals,
        problems = stats.problems,
        html = stats.html,
        video = stats.video,
        "course tree"
    );

    let static_files = match target {
        OutputTarget::Document(path) => write_document(bundle, path)?,
        OutputTarget::Directory(path) => write_directory(bundle, path)?,
        OutputTarget::Archive(path) => write_archive(bundle, path)?,
    };

    info!(path = %target.path().display(), static_files, "wrote course");
    Ok(ExportReport {
        path: target.path().to_path_buf(),
        stats,
        static_files,
    })
}

fn write_document(bundle: &ExportBundle<'_>, path: &Path) -> Result<usize> {
    let xml = render_xbundle(bundle.course, bundle.policies, bundle.about);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| CoursepackError::io(&dir, e))?;
    std::fs::write(path, xml).map_err(|e| CoursepackError::io(path, e))?;
    debug!(path = %path.display(), "wrote xbundle document");
    bundle.assets.copy_into(&dir)
}

fn write_directory(bundle: &ExportBundle<'_>, dir: &Path) -> Result<usize> {
    if !dir.exists() {
        info!(path = %dir.display(), "creating output directory");
    }
    std::fs::create_dir_all(dir).map_err(|e| CoursepackError::io(dir, e))?;
    let copied = bundle.assets.copy_into(dir)?;
    for file in directory_files(bundle.course, bundle.policies, bundle.about) {
        write_file(dir, &file)?;
    }
    Ok(copied)
}

fn write_file(dir: &Path, file: &OlxFile) -> Result<()> {
    let path = dir.join(&file.path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CoursepackError::io(parent, e))?;
    }
    std::fs::write(&path, &file.contents).map_err(|e| CoursepackError::io(&path, e))
}

/// Stage the directory form in a scratch directory and pack it.
///
/// The staging directory is removed on every path out of this function, and
/// a partially written archive is deleted.
fn write_archive(bundle: &ExportBundle<'_>, path: &Path) -> Result<usize> {
    let staging = tempfile::Builder::new()
        .prefix("coursepack-out")
        .tempdir()
        .map_err(|e| CoursepackError::io(std::env::temp_dir(), e))?;
    let course_dir = staging.path().join("course");
    let copied = write_directory(bundle, &course_dir)?;
    pack_or_remove(&course_dir, path)?;
    debug!(staging = %staging.path().display(), "packed staging directory");
    Ok(copied)
}

/// Pack `course_dir` into `path`, deleting a partially written archive on failure.
fn pack_or_remove(course_dir: &Path, path: &Path) -> Result<()> {
    let created_before = path.exists();
    pack(course_dir, path).inspect_err(|_| {
        if !created_before && path.is_file() {
            if let Err(rm) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %rm, "cannot remove partial archive");
            }
        }
    })
}

fn pack(course_dir: &Path, path: &Path) -> Result<()> {
    let archive_err = |e: std::io::Error| CoursepackError::Archive(format!("{}: {e}", path.display()));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CoursepackError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| CoursepackError::io(path, e))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all("course", course_dir)
        .map_err(archive_err)?;
    builder
        .into_inner()
        .and_then(|gz| gz.finish())
        .map_err(archive_err)?;
    Ok(())
}
