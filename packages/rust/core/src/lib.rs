//! Course conversion pipeline for coursepack.
//!
//! This crate ties together input opening, metadata and policy building,
//! the syllabus walk, and OLX export into the end-to-end
//! [`convert_course`](pipeline::convert_course) workflow.

pub mod exporter;
pub mod metadata;
pub mod olx;
pub mod pipeline;
pub mod policy;
pub mod source;
pub mod walker;

pub use exporter::{ExportBundle, ExportReport, OutputTarget, export};
pub use metadata::{parse_metadata, read_metadata};
pub use pipeline::{
    ConvertCourseConfig, ConvertResult, ProgressReporter, SilentProgress, convert_course,
    default_output,
};
pub use policy::{AboutFile, Policies, about_files, build_policies};
pub use source::CourseSource;
pub use walker::{CourseWalker, NavChapter, NavLink, read_navigation};
