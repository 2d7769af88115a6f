//! `@export` declarations: type annotations and decorator/type agreement.

use phf::phf_set;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::lex::{DeclKind, Declaration};

/// Engine node classes commonly exported as scene references.
static NODE_TYPES: phf::Set<&'static str> = phf_set! {
    "Node", "Node2D", "Node3D", "Control", "CanvasItem", "CanvasLayer",
    "Sprite2D", "AnimatedSprite2D", "AnimationPlayer", "AnimationTree",
    "Camera2D", "Area2D", "CollisionShape2D", "CharacterBody2D", "RigidBody2D",
    "StaticBody2D", "Path2D", "PathFollow2D", "Line2D", "Marker2D", "TileMap",
    "TileMapLayer", "Timer", "Label", "RichTextLabel", "Button", "TextureButton",
    "TextureRect", "ColorRect", "Panel", "PanelContainer", "Container",
    "HBoxContainer", "VBoxContainer", "GridContainer", "MarginContainer",
    "ProgressBar", "TextureProgressBar", "LineEdit", "TextEdit",
    "AudioStreamPlayer", "AudioStreamPlayer2D", "GPUParticles2D",
    "CPUParticles2D", "SubViewport", "Viewport",
};

const NUMERIC_TYPES: &[&str] = &["int", "float"];
const ENUM_TYPES: &[&str] = &["int", "String", "StringName"];

pub struct Exports;

impl Exports {
    fn inspect(&self, rel: &str, raw_line: &str, decl: &Declaration) -> Vec<Issue> {
        let mut issues = Vec::new();
        let Some(export) = decl.export_decorator() else {
            return issues;
        };
        let inferred = raw_line.contains(":=");
        let type_hint = decl.type_hint.as_deref();

        if type_hint.is_none() && !inferred {
            let mut issue = Issue::new(
                self.id(),
                rel,
                decl.line,
                "missing_export_type",
                format!("exported variable '{}' has no type annotation", decl.name),
                Severity::Warning,
            );
            if let Some(value) = &decl.value {
                issue = issue.with_suggestion(format!("var {}: <Type> = {}", decl.name, value));
            }
            issues.push(issue);
        }

        match (export.name.as_str(), type_hint) {
            ("export_range", Some(t)) if !NUMERIC_TYPES.contains(&t) => {
                issues.push(
                    Issue::new(
                        self.id(),
                        rel,
                        decl.line,
                        "export_range_type",
                        format!("@export_range on '{}' of non-numeric type {}", decl.name, t),
                        Severity::Warning,
                    )
                    .with_suggestion("use int or float"),
                );
            }
            ("export_enum", Some(t)) if !ENUM_TYPES.contains(&t) => {
                issues.push(
                    Issue::new(
                        self.id(),
                        rel,
                        decl.line,
                        "export_enum_type",
                        format!("@export_enum on '{}' must be int or String, not {}", decl.name, t),
                        Severity::Warning,
                    )
                    .with_suggestion("use int or String"),
                );
            }
            _ => {}
        }

        if let Some(t) = type_hint {
            if NODE_TYPES.contains(t) && !decl.has_default {
                issues.push(
                    Issue::new(
                        self.id(),
                        rel,
                        decl.line,
                        "node_export_without_default",
                        format!("node export '{}: {}' is null until assigned in the editor", decl.name, t),
                        Severity::Info,
                    )
                    .with_suggestion("assert the reference in _ready() or use a NodePath"),
                );
            }
        }

        issues
    }
}

impl Check for Exports {
    fn id(&self) -> &'static str {
        "exports"
    }

    fn name(&self) -> &'static str {
        "Exported variables"
    }

    fn category(&self) -> Category {
        Category::Godot
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.issues")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let mut exports = 0usize;
        for (file, facts) in ctx.project.sources() {
            for decl in facts.declarations_of(DeclKind::Export) {
                exports += 1;
                out.extend(self.inspect(&file.rel_path, file.line(decl.line), decl));
            }
        }
        out.set("exports", exports);
        out.set("issues", out.issues.len());
        out.set("by_type", serde_json::to_value(super::type_counts(&out.issues))?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    #[test]
    fn test_export_rules() {
        let src = "extends Node\n\
@export var speed = 10\n\
@export var inferred := 2.5\n\
@export_range(0, 10) var label_text: String = \"a\"\n\
@export_enum(\"A\", \"B\") var mode: float = 0.0\n\
@export var target: Node2D\n\
@export_range(0, 1) var ratio: float = 0.5\n";
        let out = testutil::run(&Exports, &[("a.gd", src)]);
        let got: Vec<(usize, &str)> = out.issues.iter().map(|i| (i.line, i.issue_type.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (2, "missing_export_type"),
                (4, "export_range_type"),
                (5, "export_enum_type"),
                (6, "node_export_without_default"),
            ]
        );
        assert_eq!(out.summary["exports"], 6);
    }

    #[test]
    fn test_decorator_on_previous_line() {
        let out = testutil::run(&Exports, &[("a.gd", "@export\nvar hp = 3\n")]);
        assert_eq!(testutil::types(&out), vec!["missing_export_type"]);
        assert_eq!(out.issues[0].line, 2);
    }
}
