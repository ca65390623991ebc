//! Course page markup conversion.
//!
//! Turns the HTML pages of a course dump into units of content: XHTML
//! fragments, video references and PDF viewers, while collecting the local
//! files the converted markup refers to.

pub mod assets;
pub mod classify;
pub mod context;
pub mod dom;
pub mod pdf;
pub mod section;
pub mod video;
pub mod xhtml;

pub use assets::{Resolved, StaticAssets};
pub use classify::{LinkFragment, LinkMatcher, MatcherRegistry, convert_nested_page};
pub use context::{ConversionContext, MarkupOptions};
pub use dom::{parse_page, robust_locate};
pub use section::{BodyChild, convert_body, convert_media_gallery};
pub use xhtml::{to_xhtml, to_xhtml_verbatim};
