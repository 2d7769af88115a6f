//! Unreferenced private functions, private members and classes.
//!
//! A name counts as referenced when it appears as an identifier anywhere
//! besides its own declaration. Engine callbacks, scene connection targets
//! and names spelled out in string literals are treated as used.

use super::method_visibility::is_externally_invoked;
use super::{Category, Check, CheckContext, CheckOutput, Input, Issue, Severity, Threshold};
use crate::index::Index;
use crate::lex::DeclKind;

pub struct DeadCode;

/// Uses of `name` outside its declaration: other files count fully, the
/// declaring file minus the declaration itself.
fn uses(index: &Index, name: &str, file: &str) -> usize {
    let home = index.identifier_count(name, file).saturating_sub(1);
    let elsewhere: usize = index
        .identifiers
        .get(name)
        .map(|files| files.iter().filter(|(f, _)| f.as_str() != file).map(|(_, n)| *n).sum())
        .unwrap_or(0);
    home + elsewhere
}

impl Check for DeadCode {
    fn id(&self) -> &'static str {
        "dead_code"
    }

    fn name(&self) -> &'static str {
        "Dead code"
    }

    fn category(&self) -> Category {
        Category::Maintenance
    }

    fn inputs(&self) -> &'static [Input] {
        &[Input::Scripts, Input::Scenes]
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.unused_functions")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let project = ctx.project;
        let index = &project.index;
        let mut functions = 0usize;
        let mut members = 0usize;
        let mut classes = 0usize;

        for (file, facts) in project.sources() {
            let rel = file.rel_path.as_str();

            for f in facts.functions.iter().filter(|f| f.is_private()) {
                if is_externally_invoked(project, &f.name) || uses(index, &f.name, rel) > 0 {
                    continue;
                }
                functions += 1;
                out.push(
                    Issue::new(
                        self.id(),
                        rel,
                        f.line,
                        "unused_private_function",
                        format!("private function {}() is never called", f.name),
                        Severity::Warning,
                    )
                    .with_suggestion("delete it"),
                );
            }

            for d in &facts.declarations {
                if !matches!(d.kind, DeclKind::Constant | DeclKind::Variable)
                    || !d.private
                    || !d.is_member()
                    || d.export_decorator().is_some()
                {
                    continue;
                }
                if index.string_values.contains(&d.name) || uses(index, &d.name, rel) > 0 {
                    continue;
                }
                members += 1;
                let what = if d.kind == DeclKind::Constant { "constant" } else { "variable" };
                out.push(Issue::new(
                    self.id(),
                    rel,
                    d.line,
                    "unused_private_member",
                    format!("private {} '{}' is never read or written", what, d.name),
                    Severity::Info,
                ));
            }
        }

        let autoload_scripts = index.autoload_scripts();
        for class in index.classes.values() {
            if index.is_autoload(&class.name)
                || autoload_scripts.contains(class.file.as_str())
                || index.string_values.contains(&class.name)
            {
                continue;
            }
            if index.identifier_files_except(&class.name, &class.file).next().is_some() {
                continue;
            }
            classes += 1;
            out.push(Issue::new(
                self.id(),
                &class.file,
                class.line,
                "unused_class",
                format!("class_name {} is never referenced by another script", class.name),
                Severity::Info,
            ));
        }

        out.set("unused_functions", functions);
        out.set("unused_members", members);
        out.set("unused_classes", classes);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    const SPAWNER: &str = "class_name Spawner\n\
extends Node\n\
const _MAX = 3\n\
var _unused_timer = 0\n\
var _count = 0\n\
func _ready():\n\
\t_count = _MAX\n\
\t_helper()\n\
func _helper():\n\
\tpass\n\
func _orphan():\n\
\tpass\n\
func _on_start_pressed():\n\
\tpass\n\
func _dynamic():\n\
\tpass\n\
func run():\n\
\tcall(\"_dynamic\")\n";

    const WAVE: &str = "class_name Wave\nextends RefCounted\nvar size = 3\n";

    const MAIN: &str = "extends Node\nfunc _ready():\n\tvar w = Wave.new()\n";

    const SCENE: &str = "[gd_scene format=3]\n\n[node name=\"Root\" type=\"Node\"]\n\n[connection signal=\"pressed\" from=\"Start\" to=\".\" method=\"_on_start_pressed\"]\n";

    #[test]
    fn test_dead_code() {
        let out = testutil::run(
            &DeadCode,
            &[("spawner.gd", SPAWNER), ("wave.gd", WAVE), ("main.gd", MAIN), ("main.tscn", SCENE)],
        );
        let got: Vec<(&str, usize, &str)> = out
            .issues
            .iter()
            .map(|i| (i.file.as_str(), i.line, i.issue_type.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("spawner.gd", 1, "unused_class"),
                ("spawner.gd", 4, "unused_private_member"),
                ("spawner.gd", 11, "unused_private_function"),
            ]
        );
        assert_eq!(out.issues[2].severity, Severity::Warning);
        assert_eq!(out.summary["unused_functions"], 1);
    }

    #[test]
    fn test_private_used_from_another_file_is_not_dead() {
        let a = "extends Node\nfunc _shared():\n\tpass\n";
        let b = "extends Node\nfunc go(a):\n\ta._shared()\n";
        let out = testutil::run(&DeadCode, &[("a.gd", a), ("b.gd", b)]);
        assert!(out.issues.is_empty());
    }
}
