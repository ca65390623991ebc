//! Core domain types for the converted course tree.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Course metadata extracted once from the source metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Course number, e.g. `8.01`.
    pub course_id: String,
    pub title: String,
    /// Plain-text description, possibly empty.
    pub description: String,
}

impl Metadata {
    /// Course id with dots removed, as used for the policy display number.
    pub fn course_number(&self) -> String {
        self.course_id.replace('.', "")
    }
}

// ---------------------------------------------------------------------------
// Course tree
// ---------------------------------------------------------------------------

/// A fully converted course: metadata plus ordered chapter tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub metadata: Metadata,
    /// Semester key (`url_name` of the course run).
    pub semester: String,
    pub org: String,
    /// Name of the source course directory.
    pub dirname: String,
    pub chapters: Vec<Chapter>,
}

/// Top-level grouping of sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub display_name: String,
    pub sequentials: Vec<Sequential>,
}

/// One section page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequential {
    pub display_name: String,
    pub verticals: Vec<Vertical>,
}

/// One page-equivalent group of modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertical {
    pub display_name: String,
    pub modules: Vec<Module>,
}

impl Vertical {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            modules: Vec::new(),
        }
    }
}

/// One unit of course content inside a vertical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Module {
    Html(HtmlModule),
    Video(VideoModule),
    Pdf(PdfModule),
}

impl Module {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Html(m) => &m.display_name,
            Self::Video(m) => &m.display_name,
            Self::Pdf(m) => &m.display_name,
        }
    }
}

/// Static markup block. `markup` is well-formed XHTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlModule {
    pub display_name: String,
    pub markup: String,
}

/// Hosted video with optional trim and captions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoModule {
    pub display_name: String,
    pub youtube_id: String,
    /// Start offset in seconds.
    pub start_offset: u32,
    /// End offset in seconds; `None` means no end trim.
    pub end_offset: Option<u32>,
    /// Absolute caption file URL, if the embed referenced one.
    pub caption_url: Option<String>,
    /// Subtitle id, set once the caption was retrieved and converted.
    pub subtitles_id: Option<String>,
}

/// PDF document shown through the bundled viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfModule {
    pub display_name: String,
    /// `/static/...` path of the document.
    pub url: String,
    /// Rendered viewer markup.
    pub viewer_markup: String,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Element counts for the conversion summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseStats {
    pub chapters: usize,
    pub sequentials: usize,
    pub verticals: usize,
    pub problems: usize,
    pub html: usize,
    pub video: usize,
}

impl CourseStats {
    pub fn from_course(course: &Course) -> Self {
        let mut stats = Self {
            chapters: course.chapters.len(),
            ..Self::default()
        };
        for seq in course.chapters.iter().flat_map(|c| &c.sequentials) {
            stats.sequentials += 1;
            for vert in &seq.verticals {
                stats.verticals += 1;
                for module in &vert.modules {
                    match module {
                        Module::Html(_) => stats.html += 1,
                        Module::Video(_) => stats.video += 1,
                        Module::Pdf(_) => stats.problems += 1,
                    }
                }
            }
        }
        stats
    }
}

/// Format an offset in seconds as `HH:MM:SS`.
pub fn format_offset(secs: u32) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_format_as_clock_time() {
        assert_eq!(format_offset(0), "00:00:00");
        assert_eq!(format_offset(30), "00:00:30");
        assert_eq!(format_offset(90), "00:01:30");
        assert_eq!(format_offset(3725), "01:02:05");
    }

    #[test]
    fn course_number_drops_dots() {
        let meta = Metadata {
            course_id: "8.01SC".into(),
            title: "Classical Mechanics".into(),
            description: String::new(),
        };
        assert_eq!(meta.course_number(), "801SC");
    }

    #[test]
    fn stats_count_every_level() {
        let mut vert = Vertical::new("Lecture 1");
        vert.modules.push(Module::Html(HtmlModule {
            display_name: "Notes".into(),
            markup: "<p>hi</p>".into(),
        }));
        vert.modules.push(Module::Video(VideoModule {
            display_name: "Video: Lecture 1".into(),
            youtube_id: "abc".into(),
            start_offset: 0,
            end_offset: None,
            caption_url: None,
            subtitles_id: None,
        }));
        vert.modules.push(Module::Pdf(PdfModule {
            display_name: "Slides".into(),
            url: "/static/slides.pdf".into(),
            viewer_markup: String::new(),
        }));
        let course = Course {
            metadata: Metadata {
                course_id: "1.00".into(),
                title: "T".into(),
                description: String::new(),
            },
            semester: "course".into(),
            org: "OCW".into(),
            dirname: "1-00".into(),
            chapters: vec![Chapter {
                display_name: "Week 1".into(),
                sequentials: vec![Sequential {
                    display_name: "Lectures".into(),
                    verticals: vec![vert, Vertical::new("Empty")],
                }],
            }],
        };

        let stats = CourseStats::from_course(&course);
        assert_eq!(stats.chapters, 1);
        assert_eq!(stats.sequentials, 1);
        assert_eq!(stats.verticals, 2);
        assert_eq!((stats.html, stats.video, stats.problems), (1, 1, 1));
    }
}
