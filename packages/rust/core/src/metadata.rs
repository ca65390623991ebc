//! Course metadata from the namespaced LOM document.

use std::path::Path;

use coursepack_shared::{CoursepackError, Metadata, Result};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use tracing::{info, warn};

/// Namespaces the metadata elements may be bound to.
const LOM_NAMESPACES: &[&[u8]] = &[
    b"https://ocw.mit.edu/xmlns/LOM",
    b"http://ocw.mit.edu/xmlns/LOM",
];

/// A field addressed as "first `parent`, then its first descendant `child`".
#[derive(Debug, Clone, Copy)]
struct FieldPath {
    parent: &'static [u8],
    child: &'static [u8],
}

const COURSE_ID: FieldPath = FieldPath {
    parent: b"identifier",
    child: b"entry",
};
const TITLE: FieldPath = FieldPath {
    parent: b"title",
    child: b"string",
};
const DESCRIPTION: FieldPath = FieldPath {
    parent: b"description",
    child: b"string",
};

#[derive(Debug, Default)]
enum Capture {
    #[default]
    Waiting,
    InParent {
        depth: usize,
    },
    InChild {
        parent_depth: usize,
        depth: usize,
        text: String,
    },
    Done(Option<String>),
}

impl Capture {
    fn start(&mut self, path: FieldPath, name: &[u8], depth: usize) {
        match self {
            Self::Waiting if name == path.parent => *self = Self::InParent { depth },
            Self::InParent { depth: parent_depth } if name == path.child => {
                *self = Self::InChild {
                    parent_depth: *parent_depth,
                    depth,
                    text: String::new(),
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, chunk: &str) {
        if let Self::InChild { text, .. } = self {
            text.push_str(chunk);
        }
    }

    fn end(&mut self, depth: usize) {
        match self {
            Self::InChild { depth: d, text, .. } if *d == depth => {
                *self = Self::Done(Some(text.trim().to_string()));
            }
            Self::InParent { depth: d } if *d == depth => *self = Self::Done(None),
            _ => {}
        }
    }

    fn into_value(self) -> Option<String> {
        match self {
            Self::Done(value) => value,
            Self::InChild { text, .. } => Some(text.trim().to_string()),
            _ => None,
        }
    }
}

/// Read course id, title and description from the file at `path`.
pub fn read_metadata(path: &Path) -> Result<Metadata> {
    let xml = std::fs::read_to_string(path).map_err(|e| CoursepackError::io(path, e))?;
    let meta = parse_metadata(&xml)?;
    info!(
        course_id = %meta.course_id,
        title = %meta.title,
        "course metadata"
    );
    Ok(meta)
}

/// Parse the metadata document.
///
/// Missing id or title is an error; a missing description is logged and
/// left empty.
pub fn parse_metadata(xml: &str) -> Result<Metadata> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let paths = [COURSE_ID, TITLE, DESCRIPTION];
    let mut captures: [Capture; 3] = Default::default();
    let mut depth = 0usize;

    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(e))) => {
                depth += 1;
                if is_lom(&ns) {
                    let local = e.local_name();
                    for (capture, path) in captures.iter_mut().zip(paths) {
                        capture.start(path, local.as_ref(), depth);
                    }
                }
            }
            Ok((ns, Event::Empty(e))) => {
                if is_lom(&ns) {
                    let local = e.local_name();
                    for (capture, path) in captures.iter_mut().zip(paths) {
                        capture.start(path, local.as_ref(), depth + 1);
                        capture.end(depth + 1);
                    }
                }
            }
            Ok((_, Event::Text(t))) => {
                let text = t
                    .unescape()
                    .map_err(|e| CoursepackError::metadata(format!("bad text: {e}")))?;
                captures.iter_mut().for_each(|c| c.text(&text));
            }
            Ok((_, Event::CData(t))) => {
                let text = String::from_utf8_lossy(&t);
                captures.iter_mut().for_each(|c| c.text(&text));
            }
            Ok((_, Event::End(_))) => {
                captures.iter_mut().for_each(|c| c.end(depth));
                depth = depth.saturating_sub(1);
            }
            Ok((_, Event::Eof)) => break,
            Err(e) => {
                return Err(CoursepackError::metadata(format!(
                    "malformed metadata document at {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    let [course_id, title, description] = captures.map(Capture::into_value);
    let course_id = course_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoursepackError::metadata("missing course identifier entry"))?;
    let title = title
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoursepackError::metadata("missing course title string"))?;
    let description = description.unwrap_or_else(|| {
        warn!(course_id = %course_id, "course has no description");
        String::new()
    });

    Ok(Metadata {
        course_id,
        title,
        description,
    })
}

fn is_lom(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if LOM_NAMESPACES.contains(uri))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns:lom="https://ocw.mit.edu/xmlns/LOM" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>Not this one</dc:title>
  <lom:general>
    <lom:identifier>
      <lom:catalog>MIT</lom:catalog>
      <lom:entry>8.01</lom:entry>
    </lom:identifier>
    <lom:identifier>
      <lom:entry>ignored</lom:entry>
    </lom:identifier>
    <lom:title>
      <lom:string language="en">Physics I: Classical Mechanics</lom:string>
    </lom:title>
    <lom:description>
      <lom:string language="en">Newtonian mechanics &amp; more.</lom:string>
    </lom:description>
  </lom:general>
</metadata>"#;

    #[test]
    fn reads_first_identifier_title_and_description() {
        let meta = parse_metadata(DOC).unwrap();
        assert_eq!(meta.course_id, "8.01");
        assert_eq!(meta.title, "Physics I: Classical Mechanics");
        assert_eq!(meta.description, "Newtonian mechanics & more.");
        assert_eq!(meta.course_number(), "801");
    }

    #[test]
    fn http_namespace_is_accepted() {
        let doc = DOC.replace("https://ocw.mit.edu/xmlns/LOM", "http://ocw.mit.edu/xmlns/LOM");
        assert_eq!(parse_metadata(&doc).unwrap().course_id, "8.01");
    }

    #[test]
    fn other_namespaces_are_ignored() {
        let doc = r#"<m xmlns:x="urn:other"><x:identifier><x:entry>1</x:entry></x:identifier></m>"#;
        let err = parse_metadata(doc).unwrap_err();
        assert!(matches!(err, CoursepackError::Metadata { .. }));
    }

    #[test]
    fn missing_description_defaults_to_empty() {
        let doc = r#"<m xmlns:lom="https://ocw.mit.edu/xmlns/LOM">
<lom:identifier><lom:entry>6.002</lom:entry></lom:identifier>
<lom:title><lom:string>Circuits</lom:string></lom:title>
</m>"#;
        let meta = parse_metadata(doc).unwrap();
        assert_eq!(meta.course_id, "6.002");
        assert_eq!(meta.description, "");
    }

    #[test]
    fn missing_title_is_error() {
        let doc = r#"<m xmlns:lom="https://ocw.mit.edu/xmlns/LOM">
<lom:identifier><lom:entry>6.002</lom:entry></lom:identifier>
</m>"#;
        let err = parse_metadata(doc).unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn first_parent_without_child_is_not_searched_further() {
        let doc = r#"<m xmlns:lom="https://ocw.mit.edu/xmlns/LOM">
<lom:identifier><lom:catalog>MIT</lom:catalog></lom:identifier>
<lom:identifier><lom:entry>6.002</lom:entry></lom:identifier>
<lom:title><lom:string>Circuits</lom:string></lom:title>
</m>"#;
        assert!(parse_metadata(doc).is_err());
    }
}
