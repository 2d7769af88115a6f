//! Comment markers (`TODO`, `FIXME`, `HACK`, …) with priority, owner and
//! context.
//!
//! Markers whose text carries no information (`# TODO`, `# FIXME: fix
//! this`, `# TODO: implement later`) are additionally reported as vague.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::lex::comments::MARKER_TAGS;
use crate::lex::{CommentMarker, Priority};

lazy_static! {
    /// Placeholder phrasings without technical specifics.
    static ref VAGUE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)^(implement|finish|complete|add|write)(\s+(this|here|later|the|it))?(\s+(function|method|code|logic|feature|implementation))?$").unwrap(),
        Regex::new(r"(?i)^(finish|complete)\s+(implementation|later)$").unwrap(),
        Regex::new(r"(?i)^add\s+(code|implementation|logic)$").unwrap(),
        Regex::new(r"(?i)^fix(\s+(this|here|it|later|the))?(\s+(bug|issue|error|problem))?$").unwrap(),
        Regex::new(r"(?i)^fix\s+(bug|issue|error|problem)$").unwrap(),
        Regex::new(r"(?i)^do(\s+(this|something|later))?$").unwrap(),
        Regex::new(r"(?i)^handle(\s+(this|here|it|the))?(\s+(error|case|exception))?$").unwrap(),
        Regex::new(r"(?i)^handle\s+(error|case|exception)$").unwrap(),
        Regex::new(r"(?i)^write\s+(code|implementation)$").unwrap(),
        Regex::new(r"(?i)^fill\s*(this\s*)?in\s*(later|here)?$").unwrap(),
        Regex::new(r"(?i)^(placeholder|stub|tbd|wip)$").unwrap(),
        Regex::new(r"(?i)^not\s+implemented(\s+yet)?$").unwrap(),
        Regex::new(r"(?i)^needs?\s+(implementation|work|to\s+be\s+done)$").unwrap(),
        Regex::new(r"(?i)^(change|update|refactor|cleanup|clean\s+up|remove|delete)\s+(this|here|me|later)$").unwrap(),
    ];
}

/// Tags that mark work still to do. `NOTE` is tracked but never vague.
const ACTION_TAGS: &[&str] = &["TODO", "FIXME", "HACK", "XXX", "BUG"];

/// True when a marker's text says nothing about the work.
pub fn is_vague(content: &str) -> bool {
    let trimmed = content.trim().trim_end_matches(['.', '!']);
    trimmed.is_empty() || VAGUE_PATTERNS.iter().any(|p| p.is_match(trimmed))
}

fn severity_for(marker: &CommentMarker) -> Severity {
    match (marker.tag.as_str(), marker.priority) {
        (_, Priority::High) | ("FIXME", _) | ("BUG", _) => Severity::Warning,
        _ => Severity::Info,
    }
}

pub struct Todos;

impl Check for Todos {
    fn id(&self) -> &'static str {
        "todos"
    }

    fn name(&self) -> &'static str {
        "TODO tracker"
    }

    fn category(&self) -> Category {
        Category::Maintenance
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.by_priority.high")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let mut by_tag: BTreeMap<&str, usize> = MARKER_TAGS.iter().map(|t| (*t, 0)).collect();
        let mut by_priority: BTreeMap<&'static str, usize> =
            [("high", 0), ("normal", 0), ("low", 0)].into_iter().collect();
        let mut by_owner: BTreeMap<String, usize> = BTreeMap::new();
        let mut vague = 0usize;
        let mut markers = Vec::new();

        for (file, facts) in ctx.project.sources() {
            for marker in &facts.markers {
                *by_tag.entry(marker.tag.as_str()).or_default() += 1;
                *by_priority.entry(marker.priority.as_str()).or_default() += 1;
                if let Some(owner) = &marker.owner {
                    *by_owner.entry(owner.clone()).or_default() += 1;
                }

                let mut message = format!("{}: {}", marker.tag, marker.content);
                if let Some(context) = &marker.context {
                    message.push_str(&format!(" (in {})", context));
                }
                out.push(
                    Issue::new(
                        self.id(),
                        &file.rel_path,
                        marker.line,
                        &marker.tag.to_lowercase(),
                        message,
                        severity_for(marker),
                    )
                    .with_category(marker.priority.as_str()),
                );

                if ACTION_TAGS.contains(&marker.tag.as_str()) && is_vague(&marker.content) {
                    vague += 1;
                    out.push(
                        Issue::new(
                            self.id(),
                            &file.rel_path,
                            marker.line,
                            "vague_marker",
                            format!("{} without actionable context", marker.tag),
                            Severity::Info,
                        )
                        .with_suggestion("say what is missing and when it matters")
                        .with_category(marker.priority.as_str()),
                    );
                }

                markers.push(json!({
                    "file": file.rel_path,
                    "line": marker.line,
                    "tag": marker.tag,
                    "priority": marker.priority.as_str(),
                    "owner": marker.owner,
                    "content": marker.content,
                    "context": marker.context,
                }));
            }
        }

        out.set("total", markers.len());
        out.set("by_tag", serde_json::to_value(by_tag)?);
        out.set("by_priority", serde_json::to_value(by_priority)?);
        out.set("by_owner", serde_json::to_value(by_owner)?);
        out.set("vague", vague);
        out.set("markers", markers);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    #[test]
    fn test_vague_content() {
        assert!(is_vague(""));
        assert!(is_vague("implement this"));
        assert!(is_vague("Fix this bug."));
        assert!(is_vague("TBD"));
        assert!(!is_vague("cache the path lookup when waves exceed 50 enemies"));
        assert!(!is_vague("fix overflow when gold > 2^31"));
    }

    #[test]
    fn test_markers_and_priorities() {
        let src = "class_name Tower\n\
# NOTE: keep in sync with data/towers.json\n\
func fire():\n\
\tpass # FIXME(ana): crashes when target is freed\n\
\t# TODO maybe cache this later\n\
\t# TODO\n\
\tvar s = \"TODO: not a comment\"\n";
        let out = testutil::run(&Todos, &[("sim/tower.gd", src)]);
        let got: Vec<(usize, &str)> = out.issues.iter().map(|i| (i.line, i.issue_type.as_str())).collect();
        assert_eq!(
            got,
            vec![(2, "note"), (4, "fixme"), (5, "todo"), (6, "todo"), (6, "vague_marker")]
        );
        assert_eq!(out.summary["by_priority"]["high"], 1);
        assert_eq!(out.summary["by_priority"]["low"], 1);
        assert_eq!(out.summary["by_owner"]["ana"], 1);
        assert_eq!(out.summary["vague"], 1);
        assert!(out.issues[1].message.contains("(in func fire)"));
        assert_eq!(out.issues[1].severity, Severity::Warning);
    }
}
