//! Static asset resolution and the source → destination copy mapping.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use coursepack_shared::{CoursepackError, Result};
use regex::Regex;
use tracing::{debug, error, info, warn};

/// `<dots and slashes>/<top-level dir>/<rest>`, e.g. `../../contents/images/a.png`.
static STATIC_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[./]+/([^/ ]+)/(.*)$").expect("valid regex"));

/// Outcome of resolving a raw `href`/`src` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Rewritten `/static/...` path; the source file is registered for copying.
    Static(String),
    /// Not a course-relative reference; callers keep the original.
    Unrecognized,
    /// Course-relative, but the source file does not exist.
    Missing,
}

/// Mapping of files to copy into the output package's `static/` tree.
///
/// Keys are unique by source path; registering a source again replaces its
/// destination. Bundled assets are keyed by destination.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    root: PathBuf,
    files: BTreeMap<PathBuf, String>,
    bundled: BTreeMap<String, &'static [u8]>,
}

impl StaticAssets {
    /// New empty mapping for the course rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Resolve a raw reference against the course tree.
    pub fn resolve(&mut self, raw: &str) -> Resolved {
        if raw.is_empty() {
            return Resolved::Unrecognized;
        }
        let clean = match raw.split_once('#') {
            Some((path, frag)) if !frag.contains('#') => path,
            _ => raw,
        };

        let Some(caps) = STATIC_PATH_RE.captures(clean) else {
            if is_external(raw) {
                debug!(reference = raw, "leaving external reference unchanged");
            } else {
                warn!(reference = raw, "unknown static file path");
            }
            return Resolved::Unrecognized;
        };

        let prefix = &caps[1];
        let rest = &caps[2];
        let src = self.root.join(prefix).join(rest);
        let dest = format!("static/{rest}");
        if !src.is_file() {
            error!(src = %src.display(), dest = %dest, "missing static file");
            return Resolved::Missing;
        }

        self.register(src, dest.clone());
        Resolved::Static(format!("/{dest}"))
    }

    /// Register a file to copy. `dest` is relative to the package root.
    pub fn register(&mut self, src: impl Into<PathBuf>, dest: impl Into<String>) {
        self.files.insert(src.into(), dest.into());
    }

    /// Register an asset embedded in the binary.
    pub fn register_bundled(&mut self, dest: impl Into<String>, bytes: &'static [u8]) {
        self.bundled.entry(dest.into()).or_insert(bytes);
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.bundled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destination registered for `src`, if any.
    pub fn destination(&self, src: &Path) -> Option<&str> {
        self.files.get(src).map(String::as_str)
    }

    /// Every destination path, files first then bundled assets.
    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.files
            .values()
            .map(String::as_str)
            .chain(self.bundled.keys().map(String::as_str))
    }

    /// Copy every registered asset under `dest_dir`, creating directories as needed.
    ///
    /// Sources that vanished since registration are skipped with a warning.
    pub fn copy_into(&self, dest_dir: &Path) -> Result<usize> {
        let mut copied = 0;
        for (src, dest) in &self.files {
            let target = dest_dir.join(dest);
            ensure_parent(&target)?;
            match std::fs::copy(src, &target) {
                Ok(_) => copied += 1,
                Err(e) => warn!(src = %src.display(), error = %e, "failed to copy static file"),
            }
        }
        for (dest, bytes) in &self.bundled {
            let target = dest_dir.join(dest);
            ensure_parent(&target)?;
            std::fs::write(&target, bytes).map_err(|e| CoursepackError::io(&target, e))?;
            copied += 1;
        }
        info!(count = copied, dest = %dest_dir.display(), "copied static files");
        Ok(copied)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CoursepackError::io(parent, e))?;
    }
    Ok(())
}

fn is_external(raw: &str) -> bool {
    raw.starts_with("http://")
        || raw.starts_with("https://")
        || raw.starts_with("mailto:")
        || raw.starts_with("//")
        || raw.starts_with('#')
}
