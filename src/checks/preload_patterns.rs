//! `preload`/`load` placement, broken resource paths and unused preload
//! constants.

use std::collections::BTreeMap;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::fix::unused::unused_preloads;
use crate::lex::{ImportKind, ImportScope};

pub struct PreloadPatterns;

impl Check for PreloadPatterns {
    fn id(&self) -> &'static str {
        "preload_patterns"
    }

    fn name(&self) -> &'static str {
        "Preload and load usage"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.broken", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let mut by_scope: BTreeMap<&'static str, usize> =
            [("class", 0), ("onready", 0), ("function", 0)].into_iter().collect();
        let mut preloads = 0usize;
        let mut loads = 0usize;
        let mut unused = 0usize;

        for (file, facts) in ctx.project.sources() {
            for import in &facts.imports {
                match import.kind {
                    ImportKind::Preload => preloads += 1,
                    ImportKind::Load => loads += 1,
                    ImportKind::Extends => continue,
                }
                *by_scope.entry(import.scope.as_str()).or_default() += 1;

                match (import.kind, import.scope) {
                    (ImportKind::Preload, ImportScope::Function) => out.push(
                        Issue::new(
                            self.id(),
                            &file.rel_path,
                            import.line,
                            "preload_in_function",
                            format!(
                                "preload(\"{}\") inside {}() still loads when the script is parsed",
                                import.target,
                                import.function.as_deref().unwrap_or("a function")
                            ),
                            Severity::Warning,
                        )
                        .with_suggestion("hoist it into a class-level const"),
                    ),
                    (ImportKind::Load, ImportScope::Class | ImportScope::Onready) if ctx.options.strict => {
                        out.push(
                            Issue::new(
                                self.id(),
                                &file.rel_path,
                                import.line,
                                "class_level_load",
                                format!("load(\"{}\") at class level could be preload()", import.target),
                                Severity::Warning,
                            )
                            .with_suggestion(format!("preload(\"{}\")", import.target)),
                        )
                    }
                    _ => {}
                }
            }

            for (idx, name) in unused_preloads(&file.lines) {
                unused += 1;
                out.push(
                    Issue::new(
                        self.id(),
                        &file.rel_path,
                        idx + 1,
                        "unused_preload",
                        format!("preloaded constant '{}' is never used", name),
                        Severity::Info,
                    )
                    .with_suggestion("gdscan fix unused-preloads"),
                );
            }
        }

        for broken in &ctx.project.index.broken_imports {
            out.push(Issue::new(
                self.id(),
                &broken.file,
                broken.line,
                "broken_import",
                format!("{}(\"{}\") points to a missing file", broken.kind, broken.target),
                Severity::Error,
            ));
        }

        out.set("preloads", preloads);
        out.set("loads", loads);
        out.set("by_scope", serde_json::to_value(by_scope)?);
        out.set("unused", unused);
        out.set("broken", ctx.project.index.broken_imports.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    const SRC: &str = "extends Node\n\
const Enemy = preload(\"res://enemy.gd\")\n\
var table = load(\"res://table.tres\")\n\
const Ghost = preload(\"res://ghost.gd\")\n\
func spawn():\n\
\tvar scene = preload(\"res://enemy.tscn\")\n\
\treturn Enemy.new()\n";

    fn files() -> Vec<(&'static str, &'static str)> {
        vec![
            ("main.gd", SRC),
            ("enemy.gd", "extends Node\n"),
            ("enemy.tscn", "[gd_scene format=3]\n"),
            ("table.tres", "[gd_resource]\n"),
        ]
    }

    #[test]
    fn test_default_rules() {
        let out = testutil::run(&PreloadPatterns, &files());
        let got: Vec<(usize, &str)> = out
            .issues
            .iter()
            .filter(|i| i.file == "main.gd")
            .map(|i| (i.line, i.issue_type.as_str()))
            .collect();
        assert_eq!(got, vec![(4, "broken_import"), (4, "unused_preload"), (6, "preload_in_function")]);
        assert_eq!(out.summary["by_scope"]["class"], 3);
        assert_eq!(out.summary["broken"], 1);
    }

    #[test]
    fn test_strict_class_level_load() {
        let out = testutil::strict(&PreloadPatterns, &files());
        assert!(out.issues.iter().any(|i| i.issue_type == "class_level_load" && i.line == 3));
    }
}
