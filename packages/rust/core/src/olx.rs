//! OLX rendering: the course tree as a single xbundle document or as the
//! file set of a course directory.
//!
//! Both forms are rendered from one named tree, so every element carries
//! the same `url_name` whichever output is chosen.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use coursepack_shared::{Course, Module, format_offset};
use quick_xml::escape::escape;

use crate::policy::{AboutFile, Policies};

// ---------------------------------------------------------------------------
// Named tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Chapter,
    Sequential,
    Vertical,
    Html,
    Video,
    Problem,
}

impl Kind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Chapter => "chapter",
            Self::Sequential => "sequential",
            Self::Vertical => "vertical",
            Self::Html => "html",
            Self::Video => "video",
            Self::Problem => "problem",
        }
    }
}

#[derive(Debug)]
enum Content {
    Children(Vec<Node>),
    Markup(String),
    Empty,
}

#[derive(Debug)]
struct Node {
    kind: Kind,
    url_name: String,
    display_name: String,
    attrs: Vec<(&'static str, String)>,
    content: Content,
}

/// Allocates `url_name`s, unique per element kind, in document order.
#[derive(Debug, Default)]
struct UrlNamer {
    used: HashMap<Kind, HashSet<String>>,
}

impl UrlNamer {
    fn allocate(&mut self, kind: Kind, display_name: &str) -> String {
        let mut base = slug(display_name);
        if base.is_empty() {
            base = kind.tag().to_string();
        }
        let used = self.used.entry(kind).or_default();
        let mut name = base.clone();
        let mut n = 1;
        while !used.insert(name.clone()) {
            n += 1;
            name = format!("{base}_{n}");
        }
        name
    }
}

/// `url_name` stem: ASCII alphanumerics, `-` and `_`, everything else
/// collapsed to single underscores.
pub fn slug(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());
    for c in display_name.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn build_tree(course: &Course) -> Vec<Node> {
    let mut namer = UrlNamer::default();
    let mut chapters = Vec::with_capacity(course.chapters.len());

    for chapter in &course.chapters {
        let url_name = namer.allocate(Kind::Chapter, &chapter.display_name);
        let mut sequentials = Vec::new();
        for seq in &chapter.sequentials {
            let url_name = namer.allocate(Kind::Sequential, &seq.display_name);
            let mut verticals = Vec::new();
            for vert in &seq.verticals {
                let url_name = namer.allocate(Kind::Vertical, &vert.display_name);
                let modules = vert
                    .modules
                    .iter()
                    .map(|m| module_node(m, &mut namer))
                    .collect();
                verticals.push(container(Kind::Vertical, url_name, &vert.display_name, modules));
            }
            sequentials.push(container(Kind::Sequential, url_name, &seq.display_name, verticals));
        }
        chapters.push(container(Kind::Chapter, url_name, &chapter.display_name, sequentials));
    }
    chapters
}

fn container(kind: Kind, url_name: String, display_name: &str, children: Vec<Node>) -> Node {
    Node {
        kind,
        url_name,
        display_name: display_name.to_string(),
        attrs: Vec::new(),
        content: Content::Children(children),
    }
}

fn module_node(module: &Module, namer: &mut UrlNamer) -> Node {
    match module {
        Module::Html(html) => Node {
            kind: Kind::Html,
            url_name: namer.allocate(Kind::Html, &html.display_name),
            display_name: html.display_name.clone(),
            attrs: Vec::new(),
            content: Content::Markup(html.markup.clone()),
        },
        Module::Video(video) => {
            let mut attrs = vec![
                ("youtube", format!("1.0:{}", video.youtube_id)),
                ("from", format_offset(video.start_offset)),
            ];
            if let Some(end) = video.end_offset {
                attrs.push(("to", format_offset(end)));
            }
            if let Some(url) = &video.caption_url {
                attrs.push(("caption_url", url.clone()));
            }
            if let Some(sub) = &video.subtitles_id {
                attrs.push(("sub", sub.clone()));
            }
            Node {
                kind: Kind::Video,
                url_name: namer.allocate(Kind::Video, &video.display_name),
                display_name: video.display_name.clone(),
                attrs,
                content: Content::Empty,
            }
        }
        Module::Pdf(pdf) => Node {
            kind: Kind::Problem,
            url_name: namer.allocate(Kind::Problem, &pdf.display_name),
            display_name: pdf.display_name.clone(),
            attrs: vec![
                ("metatype", "pdf_file".to_string()),
                ("pdf_filename", pdf.url.clone()),
            ],
            content: Content::Markup(format!("<text>{}</text>", pdf.viewer_markup)),
        },
    }
}

// ---------------------------------------------------------------------------
// Rendering helpers
// ---------------------------------------------------------------------------

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

fn open_tag(node: &Node, with_url_name: bool) -> String {
    let mut tag = format!("<{}", node.kind.tag());
    push_attr(&mut tag, "display_name", &node.display_name);
    if with_url_name {
        push_attr(&mut tag, "url_name", &node.url_name);
    }
    for (name, value) in &node.attrs {
        push_attr(&mut tag, name, value);
    }
    tag
}

fn pointer(node: &Node) -> String {
    let mut tag = format!("<{}", node.kind.tag());
    push_attr(&mut tag, "url_name", &node.url_name);
    tag.push_str("/>");
    tag
}

fn course_attrs(course: &Course) -> String {
    let mut attrs = String::new();
    push_attr(&mut attrs, "url_name", &course.semester);
    push_attr(&mut attrs, "org", &course.org);
    push_attr(&mut attrs, "course", &course.metadata.course_id);
    push_attr(&mut attrs, "name", &course.metadata.title);
    push_attr(&mut attrs, "semester", &course.semester);
    push_attr(&mut attrs, "dirname", &course.dirname);
    attrs
}

// ---------------------------------------------------------------------------
// Single document
// ---------------------------------------------------------------------------

/// Render the whole course, policies and about documents as one xbundle.
pub fn render_xbundle(course: &Course, policies: &Policies, about: &[AboutFile]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<xbundle>\n");

    out.push_str("  <metadata>\n");
    out.push_str(&format!(
        "    <policies semester=\"{}\">\n",
        escape(&policies.semester)
    ));
    out.push_str(&format!(
        "      <gradingpolicy>{}</gradingpolicy>\n",
        escape(&policies.grading_policy_json())
    ));
    out.push_str(&format!(
        "      <policy>{}</policy>\n",
        escape(&policies.policy_json())
    ));
    out.push_str("    </policies>\n    <about>\n");
    for file in about {
        out.push_str(&format!(
            "      <file filename=\"{}\">{}</file>\n",
            escape(file.filename),
            escape(&file.content)
        ));
    }
    out.push_str("    </about>\n  </metadata>\n");

    out.push_str(&format!("  <course{}>\n", course_attrs(course)));
    for chapter in build_tree(course) {
        write_inline(&mut out, &chapter, 2);
    }
    out.push_str("  </course>\n</xbundle>\n");
    out
}

fn write_inline(out: &mut String, node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    out.push_str(&open_tag(node, true));
    match &node.content {
        Content::Empty => out.push_str("/>\n"),
        Content::Markup(markup) => {
            out.push('>');
            out.push_str(markup);
            out.push_str(&format!("</{}>\n", node.kind.tag()));
        }
        Content::Children(children) => {
            out.push_str(">\n");
            for child in children {
                write_inline(out, child, depth + 1);
            }
            out.push_str(&format!("{indent}</{}>\n", node.kind.tag()));
        }
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// A file of the course directory, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OlxFile {
    pub path: PathBuf,
    pub contents: String,
}

impl OlxFile {
    fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Every file of the course directory, except static assets.
pub fn directory_files(course: &Course, policies: &Policies, about: &[AboutFile]) -> Vec<OlxFile> {
    let mut files = Vec::new();
    let semester = &course.semester;

    let mut pointer_attrs = String::new();
    push_attr(&mut pointer_attrs, "url_name", semester);
    push_attr(&mut pointer_attrs, "org", &course.org);
    push_attr(&mut pointer_attrs, "course", &course.metadata.course_id);
    files.push(OlxFile::new("course.xml", format!("<course{pointer_attrs}/>\n")));

    let tree = build_tree(course);
    let mut root = format!("<course{}>\n", course_attrs(course));
    for chapter in &tree {
        root.push_str(&format!("  {}\n", pointer(chapter)));
        collect_node_files(chapter, &mut files);
    }
    root.push_str("</course>\n");
    files.push(OlxFile::new(format!("course/{semester}.xml"), root));

    files.push(OlxFile::new(
        format!("policies/{semester}/policy.json"),
        policies.policy_json(),
    ));
    files.push(OlxFile::new(
        format!("policies/{semester}/grading_policy.json"),
        policies.grading_policy_json(),
    ));
    for file in about {
        files.push(OlxFile::new(
            format!("about/{}", file.filename),
            file.content.clone(),
        ));
    }
    files
}

fn collect_node_files(node: &Node, files: &mut Vec<OlxFile>) {
    let tag = node.kind.tag();
    let xml_path = format!("{tag}/{}.xml", node.url_name);

    match (&node.content, node.kind) {
        (Content::Markup(markup), Kind::Html) => {
            let mut xml = format!("<{tag}");
            push_attr(&mut xml, "filename", &node.url_name);
            push_attr(&mut xml, "display_name", &node.display_name);
            xml.push_str("/>\n");
            files.push(OlxFile::new(xml_path, xml));
            files.push(OlxFile::new(format!("{tag}/{}.html", node.url_name), markup.clone()));
        }
        (Content::Markup(markup), _) => {
            files.push(OlxFile::new(
                xml_path,
                format!("{}>{markup}</{tag}>\n", open_tag(node, false)),
            ));
        }
        (Content::Empty, _) => {
            files.push(OlxFile::new(xml_path, format!("{}/>\n", open_tag(node, false))));
        }
        (Content::Children(children), _) => {
            let mut xml = format!("{}>\n", open_tag(node, false));
            for child in children {
                xml.push_str(&format!("  {}\n", pointer(child)));
            }
            xml.push_str(&format!("</{tag}>\n"));
            files.push(OlxFile::new(xml_path, xml));
            for child in children {
                collect_node_files(child, files);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{about_files, build_policies};
    use coursepack_shared::{
        Chapter, HtmlModule, Metadata, PdfModule, Sequential, Vertical, VideoModule,
    };

    fn course() -> Course {
        let html = |name: &str, markup: &str| {
            Module::Html(HtmlModule {
                display_name: name.into(),
                markup: markup.into(),
            })
        };
        Course {
            metadata: Metadata {
                course_id: "8.01".into(),
                title: "Physics & Stuff".into(),
                description: "Mechanics.".into(),
            },
            semester: "course".into(),
            org: "OCW".into(),
            dirname: "8-01".into(),
            chapters: vec![Chapter {
                display_name: "Week 1".into(),
                sequentials: vec![Sequential {
                    display_name: "Lecture 1".into(),
                    verticals: vec![
                        Vertical {
                            display_name: "Lecture 1".into(),
                            modules: vec![html("Lecture 1", "<p>Intro</p>")],
                        },
                        Vertical {
                            display_name: "Lecture 1".into(),
                            modules: vec![
                                Module::Video(VideoModule {
                                    display_name: "Video: Lecture 1".into(),
                                    youtube_id: "abc".into(),
                                    start_offset: 30,
                                    end_offset: Some(90),
                                    caption_url: Some("https://host/a.srt".into()),
                                    subtitles_id: Some("abc".into()),
                                }),
                                Module::Pdf(PdfModule {
                                    display_name: "Notes".into(),
                                    url: "/static/notes.pdf".into(),
                                    viewer_markup: "<div class=\"pdf-viewer\"/>".into(),
                                }),
                            ],
                        },
                    ],
                }],
            }],
        }
    }

    fn parts(course: &Course) -> (Policies, Vec<AboutFile>) {
        (
            build_policies(&course.metadata, &course.semester).unwrap(),
            about_files(&course.metadata, "4 hours per week"),
        )
    }

    #[test]
    fn slugs() {
        assert_eq!(slug("Lecture 1: Motion (PDF)"), "Lecture_1_Motion_PDF");
        assert_eq!(slug("  "), "");
        assert_eq!(slug("week-1"), "week-1");
    }

    #[test]
    fn url_names_are_unique_per_kind() {
        let mut namer = UrlNamer::default();
        assert_eq!(namer.allocate(Kind::Vertical, "Lecture 1"), "Lecture_1");
        assert_eq!(namer.allocate(Kind::Vertical, "Lecture 1"), "Lecture_1_2");
        assert_eq!(namer.allocate(Kind::Html, "Lecture 1"), "Lecture_1");
        assert_eq!(namer.allocate(Kind::Html, "?"), "html");
    }

    #[test]
    fn xbundle_document() {
        let course = course();
        let (policies, about) = parts(&course);
        let xml = render_xbundle(&course, &policies, &about);

        assert!(xml.contains(r#"<policies semester="course">"#));
        assert!(xml.contains(r#"<file filename="overview.html">&lt;html&gt;Mechanics.&lt;/html&gt;</file>"#));
        assert!(xml.contains(
            r#"<course url_name="course" org="OCW" course="8.01" name="Physics &amp; Stuff" semester="course" dirname="8-01">"#
        ));
        assert!(xml.contains(r#"<vertical display_name="Lecture 1" url_name="Lecture_1_2">"#));
        assert!(xml.contains(
            r#"<video display_name="Video: Lecture 1" url_name="Video_Lecture_1" youtube="1.0:abc" from="00:00:30" to="00:01:30" caption_url="https://host/a.srt" sub="abc"/>"#
        ));
        assert!(xml.contains(
            r#"<problem display_name="Notes" url_name="Notes" metatype="pdf_file" pdf_filename="/static/notes.pdf"><text><div class="pdf-viewer"/></text></problem>"#
        ));
        assert!(xml.contains(r#"<html display_name="Lecture 1" url_name="Lecture_1"><p>Intro</p></html>"#));
    }

    #[test]
    fn directory_layout() {
        let course = course();
        let (policies, about) = parts(&course);
        let files = directory_files(&course, &policies, &about);
        let find = |p: &str| {
            files
                .iter()
                .find(|f| f.path == PathBuf::from(p))
                .unwrap_or_else(|| panic!("missing {p}"))
        };

        assert_eq!(
            find("course.xml").contents,
            "<course url_name=\"course\" org=\"OCW\" course=\"8.01\"/>\n"
        );
        assert!(find("course/course.xml").contents.contains("<chapter url_name=\"Week_1\"/>"));
        assert!(find("chapter/Week_1.xml").contents.contains("<sequential url_name=\"Lecture_1\"/>"));
        let seq = &find("sequential/Lecture_1.xml").contents;
        assert!(seq.contains("<vertical url_name=\"Lecture_1\"/>"));
        assert!(seq.contains("<vertical url_name=\"Lecture_1_2\"/>"));
        assert_eq!(
            find("html/Lecture_1.xml").contents,
            "<html filename=\"Lecture_1\" display_name=\"Lecture 1\"/>\n"
        );
        assert_eq!(find("html/Lecture_1.html").contents, "<p>Intro</p>");
        assert!(find("video/Video_Lecture_1.xml").contents.starts_with("<video display_name="));
        assert!(find("problem/Notes.xml").contents.contains("metatype=\"pdf_file\""));
        assert!(find("policies/course/policy.json").contents.contains("\"course/course\""));
        assert!(find("policies/course/grading_policy.json").contents.contains("GRADER"));
        assert_eq!(find("about/prerequisites.html").contents, "None");
    }
}
