//! PDF documents rendered through the bundled viewer.

use coursepack_shared::{Module, PdfModule};
use quick_xml::escape::escape;

use crate::assets::StaticAssets;

const VIEWER_TEMPLATE: &str = include_str!("../assets/pdf_viewer.html");
const VIEWER_JS: &[u8] = include_bytes!("../assets/pdf_viewer.js");
const VIEWER_CSS: &[u8] = include_bytes!("../assets/pdf_viewer.css");

pub const VIEWER_JS_DEST: &str = "static/js/pdf_viewer.js";
pub const VIEWER_CSS_DEST: &str = "static/css/pdf_viewer.css";

/// Viewer markup for the document at `url`.
pub fn render_viewer(url: &str) -> String {
    VIEWER_TEMPLATE
        .trim_end()
        .replace("{{ pdf_file_url }}", &escape(url))
}

/// A Pdf module for `url`, registering the viewer's script and stylesheet.
pub fn pdf_module(title: &str, url: &str, assets: &mut StaticAssets) -> Module {
    assets.register_bundled(VIEWER_JS_DEST, VIEWER_JS);
    assets.register_bundled(VIEWER_CSS_DEST, VIEWER_CSS);
    Module::Pdf(PdfModule {
        display_name: title.to_string(),
        url: url.to_string(),
        viewer_markup: render_viewer(url),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_embeds_escaped_url() {
        let html = render_viewer("/static/notes/a&b.pdf");
        assert!(html.contains(r#"data-pdf-url="/static/notes/a&amp;b.pdf""#));
        assert!(!html.contains("{{"));
        assert!(html.starts_with("<div"));
    }

    #[test]
    fn module_registers_viewer_assets_once() {
        let mut assets = StaticAssets::new("/course");
        pdf_module("Lecture 1", "/static/lec1.pdf", &mut assets);
        pdf_module("Lecture 2", "/static/lec2.pdf", &mut assets);
        let dests: Vec<&str> = assets.destinations().collect();
        assert_eq!(dests, vec![VIEWER_CSS_DEST, VIEWER_JS_DEST]);
    }
}
