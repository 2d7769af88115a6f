//! Comment markers (`TODO`, `FIXME`, …) with priority and context.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::comment_part;

lazy_static! {
    static ref MARKER: Regex = Regex::new(
        r"\b(TODO|FIXME|HACK|XXX|BUG|NOTE|OPTIMIZE|REFACTOR)\b(?:\(([^)]*)\))?\s*:?\s*(.*)"
    )
    .unwrap();
    static ref HIGH_WORDS: Regex = Regex::new(
        r"(?i)\b(urgent|asap|critical|crash(es)?|important|security|broken|blocker|must|immediately)\b"
    )
    .unwrap();
    static ref LOW_WORDS: Regex = Regex::new(
        r"(?i)\b(later|someday|maybe|eventually|nice to have|consider|optional|minor|low priority|could)\b"
    )
    .unwrap();
    static ref CONTEXT: Regex = Regex::new(
        r"^\s*(?:static\s+)?(func|class_name|class)\s+([A-Za-z_][A-Za-z0-9_]*)"
    )
    .unwrap();
}

/// Marker tags in display order.
pub const MARKER_TAGS: &[&str] = &[
    "TODO", "FIXME", "HACK", "XXX", "BUG", "NOTE", "OPTIMIZE", "REFACTOR",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    pub fn classify(content: &str) -> Self {
        if HIGH_WORDS.is_match(content) {
            Priority::High
        } else if LOW_WORDS.is_match(content) {
            Priority::Low
        } else {
            Priority::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentMarker {
    pub tag: String,
    /// Optional owner from `TODO(name):`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub content: String,
    pub line: usize,
    pub priority: Priority,
    /// Nearest preceding `func`, `class` or `class_name`, e.g. `func spawn`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

pub fn extract_markers(lines: &[String]) -> Vec<CommentMarker> {
    let mut markers = Vec::new();

    for (idx, raw) in lines.iter().enumerate() {
        let Some(comment) = comment_part(raw) else {
            continue;
        };
        let Some(caps) = MARKER.captures(comment) else {
            continue;
        };
        let content = caps[3].trim().to_string();
        markers.push(CommentMarker {
            tag: caps[1].to_string(),
            owner: caps.get(2).map(|m| m.as_str().trim().to_string()),
            priority: Priority::classify(&content),
            content,
            line: idx + 1,
            context: context_for(lines, idx),
        });
    }

    markers
}

fn context_for(lines: &[String], idx: usize) -> Option<String> {
    lines[..=idx]
        .iter()
        .rev()
        .find_map(|l| CONTEXT.captures(l).map(|c| format!("{} {}", &c[1], &c[2])))
}
