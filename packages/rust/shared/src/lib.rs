//! Shared types, error model, and configuration for coursepack.
//!
//! This crate is the foundation depended on by all other coursepack crates.
//! It provides:
//! - [`CoursepackError`]: the unified error type
//! - Course tree types ([`Course`], [`Chapter`], [`Sequential`], [`Vertical`], [`Module`])
//! - Configuration ([`AppConfig`], [`ConversionSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AboutConfig, AppConfig, CaptionsConfig, ConversionSettings, DefaultsConfig, MarkupConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{CoursepackError, Result};
pub use types::{
    Chapter, Course, CourseStats, HtmlModule, Metadata, Module, PdfModule, Sequential, Vertical,
    VideoModule, format_offset,
};
