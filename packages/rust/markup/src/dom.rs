//! DOM helpers over `scraper` documents.
//!
//! Course pages are frequently malformed (unclosed tags, stray attributes),
//! so lookups here tolerate content that the parser attached to the wrong
//! parent.

use std::path::Path;

use coursepack_shared::{CoursepackError, Result};
use scraper::{ElementRef, Html};
use tracing::warn;

/// Read and parse an HTML page. Invalid UTF-8 is replaced, not rejected.
pub fn parse_page(path: &Path) -> Result<Html> {
    let bytes = std::fs::read(path).map_err(|e| CoursepackError::io(path, e))?;
    Ok(Html::parse_document(&String::from_utf8_lossy(&bytes)))
}

/// Element children of `el`, skipping text and comment nodes.
pub fn element_children<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children().filter_map(ElementRef::wrap)
}

/// All element descendants of `el`, excluding `el` itself, in document order.
pub fn element_descendants<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// First descendant `<tag id="id">`.
pub fn find_by_id<'a>(root: ElementRef<'a>, tag: &str, id: &str) -> Option<ElementRef<'a>> {
    element_descendants(root).find(|e| e.value().name() == tag && e.value().id() == Some(id))
}

/// First descendant with the given tag name.
pub fn find_tag<'a>(root: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element_descendants(root).find(|e| e.value().name() == tag)
}

/// Locate `<div id>` or `<main id>`, tolerating misnested markup.
///
/// A match with no element children is replaced by its parent element: the
/// parser has closed the container early and its content became siblings.
pub fn robust_locate<'a>(root: ElementRef<'a>, id: &str, path: &Path) -> Option<ElementRef<'a>> {
    let found = ["div", "main"]
        .iter()
        .find_map(|tag| find_by_id(root, tag, id))?;

    if element_children(found).next().is_some() {
        return Some(found);
    }

    let parent = found.parent().and_then(ElementRef::wrap)?;
    warn!(
        path = %path.display(),
        id,
        parent = parent.value().name(),
        children = element_children(parent).count(),
        "empty content container, using its parent instead"
    );
    Some(parent)
}

pub fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// Text before the first child element (what a tree API calls `.text`).
pub fn direct_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in el.children() {
        match child.value().as_text() {
            Some(text) => out.push_str(text),
            None if child.value().is_element() => break,
            None => {}
        }
    }
    out.trim().to_string()
}

/// All text of the subtree, trimmed.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// The nearest preceding sibling that is an element.
pub fn prev_element_sibling<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.prev_siblings().find_map(ElementRef::wrap)
}

/// A `<p>` holding nothing but non-breaking spaces.
pub fn is_spacer_paragraph(el: ElementRef<'_>) -> bool {
    if el.value().name() != "p" || element_children(el).next().is_some() {
        return false;
    }
    let text: String = el.text().collect();
    text.contains('\u{a0}') && text.chars().all(|c| c == '\u{a0}' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn robust_locate_prefers_div_then_main() {
        let html = doc(r#"<body><main id="x"><p>main</p></main><div id="x"><p>div</p></div></body>"#);
        let found = robust_locate(html.root_element(), "x", Path::new("page.htm")).unwrap();
        assert_eq!(found.value().name(), "div");
    }

    #[test]
    fn robust_locate_promotes_childless_match() {
        let html = doc(
            r#"<body><section id="outer"><div id="course_inner_section"></div><p>one</p><p>two</p></section></body>"#,
        );
        let found =
            robust_locate(html.root_element(), "course_inner_section", Path::new("p.htm")).unwrap();
        assert_eq!(found.value().id(), Some("outer"));
        assert_eq!(element_children(found).count(), 3);
    }

    #[test]
    fn robust_locate_missing_is_none() {
        let html = doc("<body><p>nothing</p></body>");
        assert!(robust_locate(html.root_element(), "nope", Path::new("p.htm")).is_none());
    }

    #[test]
    fn direct_text_stops_at_first_element() {
        let html = doc("<body><h3 id='t'> Lecture 1 <em>notes</em> tail</h3></body>");
        let h3 = find_by_id(html.root_element(), "h3", "t").unwrap();
        assert_eq!(direct_text(h3), "Lecture 1");
        assert_eq!(text_of(h3), "Lecture 1 notes tail");
    }

    #[test]
    fn spacer_paragraphs_are_detected() {
        let html = doc("<body><p id='a'>&nbsp;</p><p id='b'>text</p><p id='c'></p></body>");
        let root = html.root_element();
        assert!(is_spacer_paragraph(find_by_id(root, "p", "a").unwrap()));
        assert!(!is_spacer_paragraph(find_by_id(root, "p", "b").unwrap()));
        assert!(!is_spacer_paragraph(find_by_id(root, "p", "c").unwrap()));
    }

    #[test]
    fn prev_sibling_skips_text() {
        let html = doc("<body><h3>Title</h3>\n  <div id='v'></div></body>");
        let div = find_by_id(html.root_element(), "div", "v").unwrap();
        assert_eq!(prev_element_sibling(div).unwrap().value().name(), "h3");
    }
}
