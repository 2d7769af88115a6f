//! Cross-file ID references and resource paths in JSON data files.

use std::collections::BTreeSet;

use serde_json::json;

use super::{Category, Check, CheckContext, CheckOutput, Input, Issue, Rating, Severity, Threshold};
use crate::data::{IdSource, ENTRY_POINTS};

pub struct JsonRefs;

impl Check for JsonRefs {
    fn id(&self) -> &'static str {
        "json_refs"
    }

    fn name(&self) -> &'static str {
        "JSON references"
    }

    fn category(&self) -> Category {
        Category::DataIntegrity
    }

    fn inputs(&self) -> &'static [Input] {
        &[Input::Data]
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.broken", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let project = ctx.project;
        let index = &project.index;
        let entry_points: BTreeSet<&str> = ENTRY_POINTS
            .iter()
            .copied()
            .chain(project.config.json.entry_points.iter().map(String::as_str))
            .collect();

        let mut referenced: BTreeSet<&str> = BTreeSet::new();
        let mut resolved = 0usize;
        let mut broken = Vec::new();
        let mut missing_resources = 0usize;

        for data in &project.data {
            for r in &data.references {
                referenced.insert(r.target.as_str());
                if index.data_ids.contains_key(&r.target) {
                    resolved += 1;
                    continue;
                }
                out.push(Issue::new(
                    self.id(),
                    &data.rel_path,
                    r.line,
                    "broken_reference",
                    format!("{} references unknown id \"{}\" ({})", r.field, r.target, r.path),
                    Severity::Error,
                ));
                broken.push(json!({
                    "file": r.file,
                    "line": r.line,
                    "path": r.path,
                    "target": r.target,
                }));
            }

            for res in data.resources.iter().filter(|r| !r.exists) {
                missing_resources += 1;
                out.push(Issue::new(
                    self.id(),
                    &data.rel_path,
                    res.line,
                    "missing_resource",
                    format!("{} points to missing file {}", res.json_path, res.path),
                    Severity::Error,
                ));
            }
        }

        let mut orphans = 0usize;
        for data in &project.data {
            if !matches!(data.id_source, IdSource::Entries | IdSource::Arrays) {
                continue;
            }
            for (id, line) in &data.ids {
                if referenced.contains(id.as_str())
                    || entry_points.contains(id.as_str())
                    || index.string_values.contains(id)
                {
                    continue;
                }
                orphans += 1;
                out.push(Issue::rated(
                    self.id(),
                    &data.rel_path,
                    *line,
                    "orphan_entry",
                    format!("\"{}\" is never referenced by data or scripts", id),
                    Rating::Low,
                ));
            }
        }

        out.set("files", project.data.len());
        out.set("ids", index.data_ids.len());
        out.set("references", resolved + broken.len());
        out.set("resolved", resolved);
        out.set("broken", broken.len() + missing_resources);
        out.set("broken_references", broken);
        out.set("missing_resources", missing_resources);
        out.set("orphans", orphans);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    const LESSONS: &str = r#"{
  "lessons": [
    {"id": "intro"},
    {"id": "home_row", "requires": ["intro"], "icon": "res://art/missing.png"},
    {"id": "top_row", "requires": ["home_row", "ghost_row"]},
    {"id": "secret"}
  ]
}"#;

    #[test]
    fn test_references() {
        let out = testutil::run(
            &JsonRefs,
            &[("data/lessons.json", LESSONS), ("game.gd", "func f():\n\tstart(\"top_row\")\n")],
        );
        let got: Vec<(usize, &str)> = out.issues.iter().map(|i| (i.line, i.issue_type.as_str())).collect();
        assert_eq!(got, vec![(4, "missing_resource"), (5, "broken_reference"), (6, "orphan_entry")]);
        assert_eq!(out.issues[2].severity, Severity::Info);
        assert!(out.issues[1].message.contains("ghost_row"));
        assert_eq!(out.summary["references"], 3);
        assert_eq!(out.summary["resolved"], 2);
        assert_eq!(out.summary["broken"], 2);
    }

    #[test]
    fn test_top_level_keys_are_not_orphans() {
        let out = testutil::run(&JsonRefs, &[("data/enemies.json", r#"{"goblin": {"hp": 3}}"#)]);
        assert!(out.issues.is_empty());
        assert_eq!(out.summary["ids"], 1);
    }
}
