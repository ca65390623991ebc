//! Opening a course dump: a directory, or a `.zip` of one.

use std::fs::File;
use std::path::{Path, PathBuf};

use coursepack_shared::{CoursepackError, Result};
use tempfile::TempDir;
use tracing::{debug, info};
use zip::ZipArchive;

/// An opened course dump.
///
/// For archives the extraction directory lives as long as this value and is
/// removed when it is dropped.
#[derive(Debug)]
pub struct CourseSource {
    root: PathBuf,
    _extracted: Option<TempDir>,
}

impl CourseSource {
    /// Open `input`, extracting it first when it ends in `.zip`.
    pub fn open(input: &Path) -> Result<Self> {
        if !input.exists() {
            return Err(CoursepackError::validation(format!(
                "input does not exist: {}",
                input.display()
            )));
        }

        if input.extension().is_some_and(|ext| ext == "zip") {
            return Self::extract(input);
        }

        if !input.is_dir() {
            return Err(CoursepackError::validation(format!(
                "input is neither a directory nor a .zip archive: {}",
                input.display()
            )));
        }
        Ok(Self {
            root: input.to_path_buf(),
            _extracted: None,
        })
    }

    fn extract(input: &Path) -> Result<Self> {
        let file = File::open(input).map_err(|e| CoursepackError::io(input, e))?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| CoursepackError::Archive(format!("{}: {e}", input.display())))?;

        let tmp = tempfile::Builder::new()
            .prefix("coursepack-src")
            .tempdir()
            .map_err(|e| CoursepackError::io(std::env::temp_dir(), e))?;
        archive
            .extract(tmp.path())
            .map_err(|e| CoursepackError::Archive(format!("{}: {e}", input.display())))?;
        info!(
            archive = %input.display(),
            entries = archive.len(),
            dir = %tmp.path().display(),
            "extracted course archive"
        );

        let root = course_dir_in(tmp.path())?.ok_or_else(|| {
            CoursepackError::Archive(format!(
                "no course directory inside {}",
                input.display()
            ))
        })?;
        debug!(root = %root.display(), "course root");

        Ok(Self {
            root,
            _extracted: Some(tmp),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the course directory.
    pub fn dirname(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The namespaced course metadata document.
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join("contents/index.htm.xml")
    }

    /// The syllabus page carrying the course navigation.
    pub fn syllabus_path(&self) -> PathBuf {
        let upper = self.root.join("contents/Syllabus/index.htm");
        if upper.exists() {
            return upper;
        }
        let lower = self.root.join("contents/syllabus/index.htm");
        if lower.exists() {
            debug!(path = %lower.display(), "using lowercase syllabus directory");
            return lower;
        }
        upper
    }

    /// The course home page.
    pub fn home_path(&self) -> PathBuf {
        self.root.join("contents/index.htm")
    }
}

/// The first directory (by name) directly under `dir`.
fn course_dir_in(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| CoursepackError::io(dir, e))?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn directory_input_is_used_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let course = dir.path().join("8-01-physics");
        std::fs::create_dir_all(course.join("contents/syllabus")).unwrap();
        std::fs::write(course.join("contents/syllabus/index.htm"), "<html/>").unwrap();

        let source = CourseSource::open(&course).unwrap();
        assert_eq!(source.root(), course);
        assert_eq!(source.dirname(), "8-01-physics");
        assert_eq!(
            source.syllabus_path(),
            course.join("contents/syllabus/index.htm")
        );
    }

    #[test]
    fn zip_is_extracted_and_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("course.zip");
        write_zip(
            &zip_path,
            &[
                ("8-01-physics/", ""),
                ("8-01-physics/contents/", ""),
                ("8-01-physics/contents/index.htm.xml", "<lom/>"),
            ],
        );

        let source = CourseSource::open(&zip_path).unwrap();
        let root = source.root().to_path_buf();
        assert_eq!(source.dirname(), "8-01-physics");
        assert!(source.metadata_path().exists());

        drop(source);
        assert!(!root.exists());
    }

    #[test]
    fn zip_without_directory_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("flat.zip");
        write_zip(&zip_path, &[("index.htm", "<html/>")]);

        let err = CourseSource::open(&zip_path).unwrap_err();
        assert!(matches!(err, CoursepackError::Archive(_)));
    }

    #[test]
    fn corrupt_zip_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("broken.zip");
        std::fs::write(&zip_path, b"not a zip").unwrap();

        let err = CourseSource::open(&zip_path).unwrap_err();
        assert!(matches!(err, CoursepackError::Archive(_)));
    }

    #[test]
    fn missing_input_is_validation_error() {
        let err = CourseSource::open(Path::new("/no/such/course")).unwrap_err();
        assert!(matches!(err, CoursepackError::Validation { .. }));
    }
}
