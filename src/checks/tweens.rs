//! Tween usage: per-frame creation, the legacy node API and member tweens
//! that are replaced without being killed.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::naming::HOT_PATH_HOOKS;
use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::lex::{code_part, enclosing_function, mask_strings, DeclKind};

lazy_static! {
    static ref CREATE: Regex = Regex::new(r"\bcreate_tween\s*\(").unwrap();
    static ref LEGACY: Regex = Regex::new(r"\bTween\.new\s*\(").unwrap();
    static ref ASSIGN: Regex =
        Regex::new(r"^\s*(?:self\.)?([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?:[A-Za-z_][A-Za-z0-9_.]*\.)?create_tween\s*\(")
            .unwrap();
}

pub struct Tweens;

impl Check for Tweens {
    fn id(&self) -> &'static str {
        "tweens"
    }

    fn name(&self) -> &'static str {
        "Tween usage"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.hot_path")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let mut created = 0usize;
        let mut hot_path = 0usize;
        let mut legacy = 0usize;
        let mut unkilled = 0usize;

        for (file, facts) in ctx.project.sources() {
            let masked: Vec<String> = file.lines.iter().map(|l| mask_strings(code_part(l))).collect();
            // Member name -> declaration line, for members holding a tween.
            let members: BTreeMap<&str, usize> = facts
                .declarations_of(DeclKind::Variable)
                .filter(|d| d.is_member())
                .map(|d| (d.name.as_str(), d.line))
                .collect();
            let mut tween_members: BTreeMap<&str, usize> = facts
                .declarations_of(DeclKind::Variable)
                .filter(|d| d.is_member() && d.type_hint.as_deref() == Some("Tween"))
                .map(|d| (d.name.as_str(), d.line))
                .collect();

            for (idx, code) in masked.iter().enumerate() {
                let line_no = idx + 1;
                let function = enclosing_function(&facts.functions, line_no).map(|f| f.name.as_str());

                if CREATE.is_match(code) {
                    created += 1;
                    if let Some(hook) = function.filter(|f| HOT_PATH_HOOKS.contains(f)) {
                        hot_path += 1;
                        out.push(
                            Issue::new(
                                self.id(),
                                &file.rel_path,
                                line_no,
                                "hot_path_tween",
                                format!("create_tween() inside {}() starts a new tween every frame", hook),
                                Severity::Warning,
                            )
                            .with_suggestion("create the tween on a state change, not per frame"),
                        );
                    }
                    if let Some(caps) = ASSIGN.captures(code) {
                        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                        if let Some((member, line)) = members.get_key_value(name) {
                            tween_members.entry(*member).or_insert(*line);
                        }
                    }
                }

                if LEGACY.is_match(code) {
                    legacy += 1;
                    out.push(
                        Issue::new(
                            self.id(),
                            &file.rel_path,
                            line_no,
                            "legacy_tween",
                            "Tween.new() is the Godot 3 node API",
                            Severity::Warning,
                        )
                        .with_suggestion("create_tween()"),
                    );
                }
            }

            for (name, line) in tween_members {
                let kill = format!("{}.kill", name);
                if masked.iter().any(|l| l.contains(&kill)) {
                    continue;
                }
                unkilled += 1;
                out.push(
                    Issue::new(
                        self.id(),
                        &file.rel_path,
                        line,
                        "tween_not_killed",
                        format!("member tween '{}' is never killed before being replaced", name),
                        Severity::Info,
                    )
                    .with_suggestion(format!("if {0}: {0}.kill()", name)),
                );
            }
        }

        out.set("created", created);
        out.set("hot_path", hot_path);
        out.set("legacy", legacy);
        out.set("unkilled_members", unkilled);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    #[test]
    fn test_tween_rules() {
        let src = "extends Node2D\n\
var _fade: Tween\n\
var _pulse\n\
var _shake: Tween\n\
func _process(delta):\n\
\tcreate_tween().tween_property(self, \"modulate\", Color.RED, 0.2)\n\
func pulse():\n\
\t_pulse = create_tween()\n\
func shake():\n\
\tif _shake:\n\
\t\t_shake.kill()\n\
\t_shake = create_tween()\n\
func old():\n\
\tvar t = Tween.new()\n";
        let out = testutil::run(&Tweens, &[("a.gd", src)]);
        let got: Vec<(usize, &str)> = out.issues.iter().map(|i| (i.line, i.issue_type.as_str())).collect();
        assert_eq!(
            got,
            vec![(2, "tween_not_killed"), (3, "tween_not_killed"), (6, "hot_path_tween"), (14, "legacy_tween")]
        );
        assert_eq!(out.summary["created"], 3);
    }
}
