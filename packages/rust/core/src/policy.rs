//! Course policy, grading policy and about documents.

use coursepack_shared::{CoursepackError, Metadata, Result};
use serde_json::Value;
use tracing::debug;

/// Built-in course policy. Its single key and course number are rewritten
/// for each course.
const POLICY_TEMPLATE: &str = r#"{
    "course/2013_Spring": {
        "start": "2013-02-20T18:00",
        "end": "2013-05-30T18:00",
        "display_name": "Course",
        "display_coursenumber": "4201x",
        "graceperiod": "1 day 0 hours 0 minutes",
        "showanswer": "attempted",
        "rerandomize": "never",
        "tabs": [
            {"type": "courseware"},
            {"type": "course_info", "name": "Course Info"},
            {"type": "textbooks"},
            {"type": "discussion", "name": "Discussion"},
            {"type": "wiki", "name": "Wiki"},
            {"type": "progress", "name": "Progress"}
        ]
    }
}"#;

const TEMPLATE_KEY: &str = "course/2013_Spring";
const TEMPLATE_COURSE_NUMBER: &str = "4201x";

/// Built-in grading policy.
pub const GRADING_POLICY: &str = r#"{
    "GRADER": [
        {
            "type": "Homework",
            "min_count": 12,
            "drop_count": 2,
            "short_label": "HW",
            "weight": 0.15
        },
        {
            "type": "Lab",
            "min_count": 12,
            "drop_count": 2,
            "weight": 0.15
        },
        {
            "type": "Midterm Exam",
            "short_label": "Midterm",
            "min_count": 1,
            "drop_count": 0,
            "weight": 0.3
        },
        {
            "type": "Final Exam",
            "short_label": "Final",
            "min_count": 1,
            "drop_count": 0,
            "weight": 0.4
        }
    ],
    "GRADE_CUTOFFS": {
        "Pass": 0.5
    }
}"#;

/// Policy documents for one course run.
#[derive(Debug, Clone, PartialEq)]
pub struct Policies {
    pub semester: String,
    /// `{"course/<semester>": {...}}`.
    pub policy: Value,
    pub grading_policy: Value,
}

impl Policies {
    pub fn policy_json(&self) -> String {
        pretty_json(&self.policy)
    }

    pub fn grading_policy_json(&self) -> String {
        pretty_json(&self.grading_policy)
    }
}

/// Build the policies for `meta` under `semester` from the built-in template.
pub fn build_policies(meta: &Metadata, semester: &str) -> Result<Policies> {
    build_policies_with_template(POLICY_TEMPLATE, meta, semester)
}

/// Build the policies from `template`.
///
/// The template's key must come out as `course/<semester>` after
/// substitution; anything else means the template and the configured
/// semester have drifted apart, which is a configuration error.
pub fn build_policies_with_template(
    template: &str,
    meta: &Metadata,
    semester: &str,
) -> Result<Policies> {
    let expected_key = format!("course/{semester}");
    let json = template
        .replace(TEMPLATE_KEY, &expected_key)
        .replace(TEMPLATE_COURSE_NUMBER, &meta.course_number());

    let mut policy: Value = serde_json::from_str(&json)
        .map_err(|e| CoursepackError::config(format!("invalid policy template: {e}")))?;
    let Some(map) = policy.as_object_mut() else {
        return Err(CoursepackError::config("policy template is not a JSON object"));
    };

    let keys: Vec<&String> = map.keys().collect();
    if keys.len() != 1 || keys[0] != &expected_key {
        return Err(CoursepackError::config(format!(
            "policy template keys {keys:?} do not match semester {expected_key:?}"
        )));
    }

    if let Some(Value::Object(course)) = map.get_mut(&expected_key) {
        course.insert("display_name".into(), Value::String(meta.title.clone()));
    }

    let grading_policy = serde_json::from_str(GRADING_POLICY)
        .map_err(|e| CoursepackError::config(format!("invalid grading policy: {e}")))?;

    debug!(semester, "built course policies");
    Ok(Policies {
        semester: semester.to_string(),
        policy,
        grading_policy,
    })
}

// ---------------------------------------------------------------------------
// About documents
// ---------------------------------------------------------------------------

/// One file of the course's `about/` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AboutFile {
    pub filename: &'static str,
    pub content: String,
}

/// The fixed set of about documents.
pub fn about_files(meta: &Metadata, effort: &str) -> Vec<AboutFile> {
    let about = |filename, content: String| AboutFile { filename, content };
    vec![
        about("effort.html", effort.to_string()),
        about("end_date.html", String::new()),
        about("overview.html", format!("<html>{}</html>", meta.description)),
        about("prerequisites.html", "None".to_string()),
        about("short_description.html", meta.description.clone()),
        about("video.html", String::new()),
    ]
}

/// JSON with four-space indentation.
pub(crate) fn pretty_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    match serde::Serialize::serialize(value, &mut ser) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => value.to_string(),
    }
}
