//! Structural problems in `.tscn` scenes.

use super::{Category, Check, CheckContext, CheckOutput, Input, Issue, Severity, Threshold};
use crate::scene::SceneProblemKind;

pub struct SceneHealth;

impl Check for SceneHealth {
    fn id(&self) -> &'static str {
        "scene_health"
    }

    fn name(&self) -> &'static str {
        "Scene health"
    }

    fn category(&self) -> Category {
        Category::Godot
    }

    fn inputs(&self) -> &'static [Input] {
        &[Input::Scenes]
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.broken", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let limits = &ctx.project.config.scenes;
        let mut nodes = 0usize;
        let mut broken = 0usize;
        let mut deep = 0usize;
        let mut large = 0usize;

        for scene in &ctx.project.scenes {
            nodes += scene.nodes.len();

            for problem in &scene.problems {
                broken += 1;
                let (issue_type, message) = match problem.kind {
                    SceneProblemKind::MissingResource => (
                        "missing_resource",
                        format!("ext_resource points to missing file {}", problem.detail),
                    ),
                    SceneProblemKind::DuplicateSibling => (
                        "duplicate_sibling",
                        format!("two sibling nodes share the path {}", problem.detail),
                    ),
                    SceneProblemKind::UnknownResourceId => (
                        "unknown_resource_id",
                        format!("ExtResource(\"{}\") was never declared", problem.detail),
                    ),
                };
                out.push(Issue::new(
                    self.id(),
                    &scene.rel_path,
                    problem.line,
                    issue_type,
                    message,
                    Severity::Error,
                ));
            }

            // Report the first node past the limit in each branch.
            for node in scene.nodes.iter().filter(|n| n.depth == limits.max_depth + 1) {
                deep += 1;
                out.push(
                    Issue::new(
                        self.id(),
                        &scene.rel_path,
                        node.line,
                        "deep_nesting",
                        format!(
                            "node {} sits {} levels deep (max {})",
                            node.path(),
                            node.depth,
                            limits.max_depth
                        ),
                        Severity::Warning,
                    )
                    .with_suggestion("split the branch into its own scene"),
                );
            }

            if scene.nodes.len() > limits.max_nodes {
                large += 1;
                out.push(Issue::new(
                    self.id(),
                    &scene.rel_path,
                    scene.root().map(|n| n.line).unwrap_or(1),
                    "large_scene",
                    format!("scene has {} nodes (max {})", scene.nodes.len(), limits.max_nodes),
                    Severity::Info,
                ));
            }
        }

        out.set("scenes", ctx.project.scenes.len());
        out.set("nodes", nodes);
        out.set("broken", broken);
        out.set("too_deep", deep);
        out.set("too_large", large);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil::run_with;
    use crate::checks::CheckOptions;
    use crate::config::Config;
    use crate::project::Project;

    const HUD: &str = "[gd_scene format=3]\n\
\n\
[ext_resource type=\"Texture2D\" path=\"res://art/gone.png\" id=\"1_tex\"]\n\
\n\
[node name=\"Hud\" type=\"Control\"]\n\
\n\
[node name=\"A\" type=\"Control\" parent=\".\"]\n\
\n\
[node name=\"B\" type=\"Control\" parent=\"A\"]\n\
\n\
[node name=\"C\" type=\"Label\" parent=\"A/B\"]\n\
\n\
[node name=\"C\" type=\"Label\" parent=\"A/B\"]\n";

    fn project(max_depth: usize, max_nodes: usize) -> Project {
        let mut config = Config::default();
        config.scenes.max_depth = max_depth;
        config.scenes.max_nodes = max_nodes;
        Project::from_files(config, &[("ui/hud.tscn", HUD)])
    }

    #[test]
    fn test_scene_problems() {
        let out = run_with(&SceneHealth, &project(8, 150), &CheckOptions::default());
        let got: Vec<(usize, &str)> = out.issues.iter().map(|i| (i.line, i.issue_type.as_str())).collect();
        assert_eq!(got, vec![(3, "missing_resource"), (13, "duplicate_sibling")]);
        assert_eq!(out.summary["broken"], 2);
        assert_eq!(out.summary["nodes"], 5);
    }

    #[test]
    fn test_depth_and_size_limits() {
        let out = run_with(&SceneHealth, &project(2, 4), &CheckOptions::default());
        let extra: Vec<(usize, &str)> = out
            .issues
            .iter()
            .filter(|i| i.severity != Severity::Error)
            .map(|i| (i.line, i.issue_type.as_str()))
            .collect();
        assert_eq!(extra, vec![(5, "large_scene"), (11, "deep_nesting"), (13, "deep_nesting")]);
    }
}
