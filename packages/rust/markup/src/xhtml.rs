//! Well-formed XHTML serialization of parsed HTML fragments.
//!
//! Output modules must be valid XML, while source pages are tag soup. The
//! writer re-serializes the parsed tree: void elements are self-closed,
//! text and attribute values are escaped, and attributes whose names are not
//! XML names are dropped. When a [`ConversionContext`] is attached, links,
//! images and scripts are rewritten through the static asset resolver.

use std::sync::LazyLock;

use quick_xml::escape::{escape, partial_escape};
use regex::Regex;
use scraper::{ElementRef, Node};
use tracing::{debug, warn};

use crate::assets::Resolved;
use crate::context::ConversionContext;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

static XML_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_:][A-Za-z0-9_.:-]*$").expect("valid regex"));

/// Serialize `el` verbatim, without rewriting any references.
pub fn to_xhtml_verbatim(el: ElementRef<'_>) -> String {
    let mut writer = Writer {
        ctx: None,
        skip: &|_| false,
        out: String::new(),
    };
    writer.element(el);
    writer.out
}

/// Serialize `el`, rewriting `href`/`src` references into the static namespace.
pub fn to_xhtml(el: ElementRef<'_>, ctx: &mut ConversionContext) -> String {
    to_xhtml_filtered(el, ctx, &|_| false)
}

/// Like [`to_xhtml`], omitting every element for which `skip` returns `true`.
pub fn to_xhtml_filtered(
    el: ElementRef<'_>,
    ctx: &mut ConversionContext,
    skip: &dyn Fn(ElementRef<'_>) -> bool,
) -> String {
    let mut writer = Writer {
        ctx: Some(ctx),
        skip,
        out: String::new(),
    };
    writer.element(el);
    writer.out
}

/// `<a href="...">text</a>` with both parts escaped.
pub fn link_markup(href: &str, text: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape(href), partial_escape(text))
}

/// Script text, wrapped in a commented-out CDATA section when it holds
/// markup characters. Entities are not decoded inside `<script>` in HTML.
fn script_body(text: &str) -> String {
    if !text.contains(['<', '&']) {
        return text.to_string();
    }
    format!(
        "//<![CDATA[\n{}\n//]]>",
        text.replace("]]>", "]]]]><![CDATA[>")
    )
}

struct Writer<'w> {
    ctx: Option<&'w mut ConversionContext>,
    skip: &'w dyn Fn(ElementRef<'_>) -> bool,
    out: String,
}

impl Writer<'_> {
    fn element(&mut self, el: ElementRef<'_>) {
        if (self.skip)(el) {
            return;
        }
        let name = el.value().name();
        let mut attrs: Vec<(String, String)> = el
            .value()
            .attrs()
            .filter(|(k, _)| XML_NAME_RE.is_match(k))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        // Attribute storage is unordered; sort for stable output.
        attrs.sort();

        if let Some(ctx) = self.ctx.as_deref_mut() {
            let rewritten = match name {
                "a" => "href",
                "img" | "script" => "src",
                _ => "",
            };
            if let Some((_, value)) = attrs.iter_mut().find(|(k, _)| k == rewritten) {
                if let Resolved::Static(path) = ctx.assets.resolve(value) {
                    *value = path;
                }
            }
            if name == "script" {
                let src = attrs
                    .iter()
                    .find(|(k, _)| k == "src")
                    .map(|(_, v)| v.as_str())
                    .unwrap_or("");
                if !src.is_empty() && ctx.options.is_dropped_script(src) {
                    warn!(src, "dropping script that breaks converted pages");
                    return;
                }
            }
        }

        self.out.push('<');
        self.out.push_str(name);
        for (k, v) in &attrs {
            self.out.push(' ');
            self.out.push_str(k);
            self.out.push_str("=\"");
            self.out.push_str(&escape(v.as_str()));
            self.out.push('"');
        }

        if VOID_ELEMENTS.contains(&name) {
            self.out.push_str("/>");
            return;
        }
        self.out.push('>');

        let is_script = name == "script";
        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    if is_script {
                        if text.contains('\r') {
                            debug!("stripping carriage returns from script");
                        }
                        self.out.push_str(&script_body(&text.replace('\r', "")));
                    } else {
                        self.out.push_str(&partial_escape(&**text));
                    }
                }
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.element(child_el);
                    }
                }
                _ => {}
            }
        }

        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ConversionContext, MarkupOptions};
    use crate::dom::find_tag;
    use scraper::Html;

    fn context(root: &std::path::Path) -> ConversionContext {
        ConversionContext::new(root, MarkupOptions::default())
    }

    #[test]
    fn void_elements_are_self_closed_and_text_escaped() {
        let html = Html::parse_document(r#"<body><p>a &lt; b<br>c &amp; d<img src="x.png"></p></body>"#);
        let p = find_tag(html.root_element(), "p").unwrap();
        assert_eq!(
            to_xhtml_verbatim(p),
            r#"<p>a &lt; b<br/>c &amp; d<img src="x.png"/></p>"#
        );
    }

    #[test]
    fn invalid_attribute_names_and_comments_are_dropped() {
        let html = Html::parse_document(
            r#"<body><div class="x" "bad"="1" data-ok="y"><!-- note -->hi</div></body>"#,
        );
        let div = find_tag(html.root_element(), "div").unwrap();
        let out = to_xhtml_verbatim(div);
        assert!(out.starts_with(r#"<div class="x""#));
        assert!(out.contains(r#"data-ok="y""#));
        assert!(!out.contains("bad"));
        assert!(!out.contains("note"));
    }

    #[test]
    fn links_and_images_are_rewritten_to_static() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("contents/images")).unwrap();
        std::fs::write(dir.path().join("contents/images/fig.png"), b"png").unwrap();
        let mut ctx = context(dir.path());

        let html = Html::parse_document(
            r#"<body><p><img src="../../contents/images/fig.png"><a href="https://example.com/">ext</a></p></body>"#,
        );
        let p = find_tag(html.root_element(), "p").unwrap();
        let out = to_xhtml(p, &mut ctx);
        assert!(out.contains(r#"<img src="/static/images/fig.png"/>"#));
        assert!(out.contains(r#"<a href="https://example.com/">ext</a>"#));
        assert_eq!(ctx.assets.len(), 1);
    }

    #[test]
    fn blocklisted_scripts_are_dropped_and_carriage_returns_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let html = Html::parse_document(
            "<body><div><script type=\"text/javascript\" src=\"https://ocw.mit.edu/scripts/jquery-1.7.js\"></script><script type=\"text/javascript\">var a = 1;\r\nvar b = 2;</script></div></body>",
        );
        let div = find_tag(html.root_element(), "div").unwrap();
        let out = to_xhtml(div, &mut ctx);
        assert!(!out.contains("jquery"));
        assert!(out.contains("var a = 1;\nvar b = 2;"));
        assert!(!out.contains('\r'));
    }

    #[test]
    fn script_text_is_not_entity_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let html = Html::parse_document(
            "<body><div><script>if (a < b && c) { go(); }</script><p>a < b</p></div></body>",
        );
        let div = find_tag(html.root_element(), "div").unwrap();
        let out = to_xhtml(div, &mut ctx);
        assert!(out.contains("<script>//<![CDATA[\nif (a < b && c) { go(); }\n//]]></script>"));
        assert!(!out.contains("&lt; b &amp;&amp;"));
        assert!(out.contains("<p>a &lt; b</p>"));

        // still well-formed XML
        let mut reader = quick_xml::Reader::from_str(&out);
        while reader.read_event().unwrap() != quick_xml::events::Event::Eof {}
    }

    #[test]
    fn plain_script_text_is_written_as_is() {
        assert_eq!(script_body("var a = 1;"), "var a = 1;");
        assert_eq!(
            script_body("a < x[y[0]]>1"),
            "//<![CDATA[\na < x[y[0]]]]><![CDATA[>1\n//]]>"
        );
    }

    #[test]
    fn skipped_elements_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let html = Html::parse_document(
            r#"<body><div><h3>Title</h3><div class="embedbg"><script>x</script></div></div></body>"#,
        );
        let div = find_tag(html.root_element(), "div").unwrap();
        let out = to_xhtml_filtered(div, &mut ctx, &|e| {
            e.value().classes().any(|c| c == "embedbg")
        });
        assert_eq!(out, "<div><h3>Title</h3></div>");
    }

    #[test]
    fn link_markup_escapes() {
        assert_eq!(
            link_markup("https://a.b/?x=1&y=2", "Q&A"),
            r#"<a href="https://a.b/?x=1&amp;y=2">Q&amp;A</a>"#
        );
    }
}
