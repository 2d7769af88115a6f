//! Autoload singletons: missing scripts, circular dependencies, unused
//! entries and the resulting load order.

use serde_json::json;

use super::{Category, Check, CheckContext, CheckOutput, Input, Issue, Severity, Threshold};
use crate::index::DepGraph;
use crate::lex::ImportKind;
use crate::project::PROJECT_FILE;

pub struct Autoloads;

impl Check for Autoloads {
    fn id(&self) -> &'static str {
        "autoloads"
    }

    fn name(&self) -> &'static str {
        "Autoloads"
    }

    fn category(&self) -> Category {
        Category::Architecture
    }

    fn inputs(&self) -> &'static [Input] {
        &[Input::Scripts, Input::ProjectFile]
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.missing", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let index = &ctx.project.index;
        let position = |name: &str| index.autoloads.iter().position(|a| a.name == name).unwrap_or(usize::MAX);

        let mut missing = 0usize;
        let mut unused = 0usize;
        let mut graph = DepGraph::new();

        for entry in &index.autoloads {
            graph.add_node(&entry.name);
            for dep in &entry.deps {
                graph.add_edge(&entry.name, dep, ImportKind::Load, entry.line);
            }

            if !entry.exists {
                missing += 1;
                out.push(Issue::new(
                    self.id(),
                    PROJECT_FILE,
                    entry.line,
                    "missing_autoload_script",
                    format!("autoload '{}' points to missing file {}", entry.name, entry.path),
                    Severity::Error,
                ));
            } else if entry.usage_count == 0 {
                unused += 1;
                out.push(
                    Issue::new(
                        self.id(),
                        PROJECT_FILE,
                        entry.line,
                        "unused_autoload",
                        format!("autoload '{}' is never referenced", entry.name),
                        Severity::Info,
                    )
                    .with_suggestion("remove the autoload or turn it into a plain script"),
                );
            }
        }

        let mut circular = Vec::new();
        for mut cycle in graph.cycles(index.autoloads.len().max(2)) {
            // Report in declaration order.
            let start = cycle
                .iter()
                .enumerate()
                .min_by_key(|(_, name)| position(name))
                .map(|(i, _)| i)
                .unwrap_or(0);
            cycle.rotate_left(start);
            let label = if cycle.len() == 2 {
                format!("{} <-> {}", cycle[0], cycle[1])
            } else {
                let mut path = cycle.clone();
                path.push(cycle[0].clone());
                path.join(" -> ")
            };
            let line = index.autoload(&cycle[0]).map(|a| a.line).unwrap_or(0);
            out.push(Issue::new(
                self.id(),
                PROJECT_FILE,
                line,
                "circular_autoload",
                format!("circular autoload dependency: {}", label),
                Severity::Warning,
            ));
            circular.push(label);
        }

        let autoloads: Vec<_> = index
            .autoloads
            .iter()
            .map(|a| {
                json!({
                    "name": a.name,
                    "path": a.path,
                    "script": a.script,
                    "exists": a.exists,
                    "deps": a.deps,
                    "usage_count": a.usage_count,
                })
            })
            .collect();

        out.set("count", index.autoloads.len());
        out.set("missing", missing);
        out.set("unused", unused);
        out.set("circular", circular);
        out.set("load_order", index.autoload_order.clone());
        out.set("order_complete", index.autoload_order_complete);
        out.set("autoloads", autoloads);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    const PROJECT: &str = "[autoload]\n\nAudio=\"*res://audio.gd\"\nSettings=\"*res://settings.gd\"\nMain=\"*res://main.gd\"\n";

    #[test]
    fn test_load_order() {
        let out = testutil::run(
            &Autoloads,
            &[
                ("project.godot", PROJECT),
                ("audio.gd", "extends Node\nfunc play():\n\tSettings.volume()\n"),
                ("settings.gd", "extends Node\n"),
                ("main.gd", "extends Node\nfunc _ready():\n\tAudio.play()\n\tSettings.load()\n"),
            ],
        );
        assert_eq!(out.summary["load_order"], json!(["Settings", "Audio", "Main"]));
        assert_eq!(out.summary["order_complete"], true);
        // Main is never named from another script.
        assert_eq!(testutil::types(&out), vec!["unused_autoload"]);
    }

    #[test]
    fn test_mutual_dependency() {
        let out = testutil::run(
            &Autoloads,
            &[
                ("project.godot", PROJECT),
                ("audio.gd", "extends Node\nfunc play():\n\tSettings.volume()\n\tMain.go()\n"),
                ("settings.gd", "extends Node\n"),
                ("main.gd", "extends Node\nfunc _ready():\n\tAudio.play()\n\tSettings.load()\n"),
            ],
        );
        assert_eq!(out.summary["circular"], json!(["Audio <-> Main"]));
        assert_eq!(out.summary["order_complete"], false);
        let issue = out.issues.iter().find(|i| i.issue_type == "circular_autoload").unwrap();
        assert!(issue.message.contains("Audio <-> Main"));
        assert_eq!(issue.severity, Severity::Warning);
    }

    #[test]
    fn test_missing_script() {
        let out = testutil::run(&Autoloads, &[("project.godot", "[autoload]\nGhost=\"*res://ghost.gd\"\n")]);
        assert_eq!(testutil::types(&out), vec!["missing_autoload_script"]);
        assert_eq!(out.issues[0].line, 2);
    }
}
