//! Application configuration for coursepack.
//!
//! User config lives at `~/.coursepack/coursepack.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoursepackError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "coursepack.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".coursepack";

// ---------------------------------------------------------------------------
// Config structs (matching coursepack.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Remote caption retrieval.
    #[serde(default)]
    pub captions: CaptionsConfig,

    /// Markup rewriting rules.
    #[serde(default)]
    pub markup: MarkupConfig,

    /// About-page documents.
    #[serde(default)]
    pub about: AboutConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Semester key used for the course run and policy directory.
    #[serde(default = "default_semester")]
    pub semester: String,

    /// Organization attribute on the course element.
    #[serde(default = "default_org")]
    pub org: String,

    /// Default video start offset in seconds.
    #[serde(default)]
    pub video_start_offset: u32,

    /// Whether media galleries are converted.
    #[serde(default = "default_true")]
    pub include_media: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            semester: default_semester(),
            org: default_org(),
            video_start_offset: 0,
            include_media: true,
        }
    }
}

fn default_semester() -> String {
    "course".into()
}
fn default_org() -> String {
    "OCW".into()
}
fn default_true() -> bool {
    true
}

/// `[captions]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionsConfig {
    /// Host prepended to caption paths that are not absolute URLs.
    #[serde(default = "default_caption_host")]
    pub host: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            host: default_caption_host(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_caption_host() -> String {
    "https://ocw.mit.edu".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[markup]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkupConfig {
    /// Script `src` patterns whose elements are removed from converted pages.
    #[serde(default = "default_dropped_scripts")]
    pub dropped_scripts: Vec<String>,

    /// Attachment links whose label contains one of these are skipped.
    #[serde(default = "default_skipped_link_labels")]
    pub skipped_link_labels: Vec<String>,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            dropped_scripts: default_dropped_scripts(),
            skipped_link_labels: default_skipped_link_labels(),
        }
    }
}

fn default_dropped_scripts() -> Vec<String> {
    vec!["https://ocw.mit.edu/scripts/jquery-.*.js".into()]
}
fn default_skipped_link_labels() -> Vec<String> {
    vec![
        "iTunes U".into(),
        "Internet Archive".into(),
        "Removed Clips".into(),
    ]
}

/// `[about]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutConfig {
    /// Text of the effort estimate document.
    #[serde(default = "default_effort")]
    pub effort: String,
}

impl Default for AboutConfig {
    fn default() -> Self {
        Self {
            effort: default_effort(),
        }
    }
}

fn default_effort() -> String {
    "4 hours per week".into()
}

// ---------------------------------------------------------------------------
// Conversion settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime conversion settings, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ConversionSettings {
    pub semester: String,
    pub org: String,
    /// Start offset (seconds) for videos without an extracted trim.
    pub video_start_offset: u32,
    pub include_media: bool,
    pub caption_host: String,
    pub caption_timeout_secs: u64,
    pub dropped_scripts: Vec<String>,
    pub skipped_link_labels: Vec<String>,
    pub effort: String,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ConversionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            semester: config.defaults.semester.clone(),
            org: config.defaults.org.clone(),
            video_start_offset: config.defaults.video_start_offset,
            include_media: config.defaults.include_media,
            caption_host: config.captions.host.clone(),
            caption_timeout_secs: config.captions.timeout_secs,
            dropped_scripts: config.markup.dropped_scripts.clone(),
            skipped_link_labels: config.markup.skipped_link_labels.clone(),
            effort: config.about.effort.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.coursepack/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CoursepackError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.coursepack/coursepack.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CoursepackError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CoursepackError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CoursepackError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| CoursepackError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CoursepackError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
