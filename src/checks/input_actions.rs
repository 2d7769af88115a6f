//! Input action names used in code against the `[input]` section of the
//! project file.

use std::collections::{BTreeMap, BTreeSet};

use super::{Category, Check, CheckContext, CheckOutput, Input, Issue, Severity, Threshold};
use crate::index::Resolution;
use crate::lex::RefKind;

/// Prefix of the engine's built-in actions.
pub const BUILTIN_PREFIX: &str = "ui_";

pub struct InputActions;

impl Check for InputActions {
    fn id(&self) -> &'static str {
        "input_actions"
    }

    fn name(&self) -> &'static str {
        "Input actions"
    }

    fn category(&self) -> Category {
        Category::DataIntegrity
    }

    fn inputs(&self) -> &'static [Input] {
        &[Input::Scripts, Input::ProjectFile]
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.undefined", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let index = &ctx.project.index;

        // Without a project file there is nothing to validate against.
        if ctx.project.settings.is_none() {
            out.set("project_file", false);
            out.set("defined", 0);
            out.set("used", 0);
            out.set("undefined", 0);
            return Ok(out);
        }

        let mut used: BTreeMap<&str, usize> = BTreeMap::new();
        let mut undefined = BTreeSet::new();

        for r in index.references_of(RefKind::InputAction) {
            let action = r.reference.target.as_str();
            *used.entry(action).or_default() += 1;
            if r.resolution != Resolution::Unresolved || action.starts_with(BUILTIN_PREFIX) {
                continue;
            }
            undefined.insert(action);
            out.push(
                Issue::new(
                    self.id(),
                    &r.reference.file,
                    r.reference.line,
                    "undefined_input_action",
                    format!("input action \"{}\" is not defined in the project's [input] section", action),
                    Severity::Error,
                )
                .with_suggestion(format!("add \"{}\" under [input] in project.godot", action)),
            );
        }

        let unused: Vec<&str> = index
            .input_actions
            .keys()
            .map(String::as_str)
            .filter(|a| !used.contains_key(a))
            .collect();

        out.set("project_file", true);
        out.set("defined", index.input_actions.len());
        out.set("used", used.len());
        out.set("undefined", out.issues.len());
        out.set("undefined_actions", undefined.into_iter().collect::<Vec<_>>());
        out.set("unused_actions", unused);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;
    use serde_json::json;

    const PROJECT: &str = "[input]\n\njump={\n\"deadzone\": 0.5,\n\"events\": []\n}\nmove_left={\n\"deadzone\": 0.5,\n\"events\": []\n}\n";

    #[test]
    fn test_undefined_action() {
        let src = "extends Node\n\
func _physics_process(delta):\n\
\tif Input.is_action_pressed(\"jump\"):\n\
\t\tpass\n\
\tif Input.is_action_pressed(\"ui_accept\"):\n\
\t\tpass\n\
\tif Input.is_action_pressed(\"dash\"):\n\
\t\tpass\n";
        let out = testutil::run(&InputActions, &[("project.godot", PROJECT), ("player.gd", src)]);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].line, 7);
        assert_eq!(out.issues[0].severity, Severity::Error);
        assert!(out.issues[0].message.contains("\"dash\""));
        assert_eq!(out.summary["unused_actions"], json!(["move_left"]));
        assert_eq!(out.summary["defined"], 2);
    }

    #[test]
    fn test_no_project_file() {
        let out = testutil::run(&InputActions, &[("a.gd", "func f():\n\tInput.is_action_pressed(\"dash\")\n")]);
        assert!(out.issues.is_empty());
        assert_eq!(out.summary["project_file"], false);
    }
}
