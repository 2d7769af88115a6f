//! Method visibility against actual use: private methods reached from
//! other files, public methods only used at home.

use std::collections::BTreeSet;

use super::naming::LIFECYCLE_HOOKS;
use super::{Category, Check, CheckContext, CheckOutput, Input, Issue, Severity, Threshold};
use crate::project::Project;

/// Names the engine or scenes call by name.
pub(crate) fn is_externally_invoked(project: &Project, name: &str) -> bool {
    LIFECYCLE_HOOKS.contains(name)
        || project.index.scene_methods.contains(name)
        || project.index.string_values.contains(name)
}

pub struct MethodVisibility;

impl Check for MethodVisibility {
    fn id(&self) -> &'static str {
        "method_visibility"
    }

    fn name(&self) -> &'static str {
        "Method visibility"
    }

    fn category(&self) -> Category {
        Category::Structure
    }

    fn inputs(&self) -> &'static [Input] {
        &[Input::Scripts, Input::Scenes]
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.private_called_externally")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let project = ctx.project;
        let index = &project.index;
        let mut public = 0usize;
        let mut private = 0usize;
        let mut leaked = 0usize;
        let mut internal_only = 0usize;

        for (file, facts) in project.sources() {
            if file.is_test() {
                continue;
            }
            let rel = file.rel_path.as_str();
            for f in facts.functions.iter().filter(|f| f.indent == 0) {
                if LIFECYCLE_HOOKS.contains(f.name.as_str()) {
                    continue;
                }

                if f.is_private() {
                    private += 1;
                    // Other files that use the name without defining it.
                    let callers: BTreeSet<&str> = index
                        .identifier_files_except(&f.name, rel)
                        .filter(|other| {
                            !index
                                .functions
                                .get(&f.name)
                                .is_some_and(|sites| sites.iter().any(|s| s.file == *other))
                        })
                        .collect();
                    if let Some(first) = callers.iter().next() {
                        leaked += 1;
                        out.push(
                            Issue::new(
                                self.id(),
                                rel,
                                f.line,
                                "private_called_externally",
                                format!(
                                    "private method {}() is used from {}{}",
                                    f.name,
                                    first,
                                    if callers.len() > 1 {
                                        format!(" and {} other file(s)", callers.len() - 1)
                                    } else {
                                        String::new()
                                    }
                                ),
                                Severity::Warning,
                            )
                            .with_suggestion(format!("rename to {}", f.name.trim_start_matches('_'))),
                        );
                    }
                    continue;
                }

                public += 1;
                if is_externally_invoked(project, &f.name) {
                    continue;
                }
                if index.identifier_files_except(&f.name, rel).next().is_some() {
                    continue;
                }
                internal_only += 1;
                out.push(
                    Issue::new(
                        self.id(),
                        rel,
                        f.line,
                        "public_unused_externally",
                        format!("public method {}() is never referenced outside {}", f.name, rel),
                        Severity::Info,
                    )
                    .with_suggestion(format!("rename to _{}", f.name)),
                );
            }
        }

        out.set("public", public);
        out.set("private", private);
        out.set("private_called_externally", leaked);
        out.set("public_internal_only", internal_only);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    #[test]
    fn test_visibility() {
        let tower = "class_name Tower\n\
func _ready():\n\
\tpass\n\
func fire():\n\
\t_aim()\n\
func _aim():\n\
\tpass\n\
func _reload():\n\
\tpass\n\
func upgrade():\n\
\tpass\n\
func _on_pressed():\n\
\tpass\n";
        let game = "extends Node\n\
func _on_pressed():\n\
\tvar t = Tower.new()\n\
\tt.fire()\n\
\tt._reload()\n\
\tt.call(\"upgrade\")\n";
        let out = testutil::run(&MethodVisibility, &[("tower.gd", tower), ("game.gd", game)]);
        let got: Vec<(&str, usize, &str)> = out
            .issues
            .iter()
            .map(|i| (i.file.as_str(), i.line, i.issue_type.as_str()))
            .collect();
        assert_eq!(got, vec![("tower.gd", 8, "private_called_externally")]);
        assert!(out.issues[0].message.contains("game.gd"));
        assert_eq!(out.summary["public"], 2);
    }

    #[test]
    fn test_public_only_used_at_home() {
        let src = "extends Node\nfunc helper():\n\tpass\nfunc run():\n\thelper()\n";
        let out = testutil::run(&MethodVisibility, &[("a.gd", src)]);
        assert_eq!(testutil::types(&out), vec!["public_unused_externally", "public_unused_externally"]);
    }
}
