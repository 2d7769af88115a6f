//! Node path lookups: per-frame lookups, unguarded lookups, recursive
//! searches and paths looked up repeatedly instead of cached.

use std::collections::BTreeMap;

use super::naming::HOT_PATH_HOOKS;
use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::lex::{NodeRef, NodeRefKind};

/// A path looked up this many times in one file should be cached.
pub const REPEAT_LIMIT: usize = 3;

pub struct NodeRefs;

impl NodeRefs {
    fn inspect(&self, rel: &str, node: &NodeRef) -> Option<Issue> {
        let function = node.function.as_deref();

        if node.kind == NodeRefKind::FindChild {
            return Some(
                Issue::new(
                    self.id(),
                    rel,
                    node.line,
                    "find_child_usage",
                    format!("find_child(\"{}\") walks the whole subtree", node.path),
                    Severity::Info,
                )
                .with_suggestion("use a %UniqueName or an @onready reference"),
            );
        }

        if let Some(hook) = function.filter(|f| HOT_PATH_HOOKS.contains(f)) {
            if !node.onready {
                return Some(
                    Issue::new(
                        self.id(),
                        rel,
                        node.line,
                        "hot_path_node_lookup",
                        format!("node lookup '{}' runs every frame in {}()", node.path, hook),
                        Severity::Warning,
                    )
                    .with_suggestion(format!("@onready var {} = ${}", cache_name(&node.path), node.path)),
                );
            }
        }

        if !node.safe && function.is_some() && node.kind != NodeRefKind::Unique {
            return Some(
                Issue::new(
                    self.id(),
                    rel,
                    node.line,
                    "unsafe_node_ref",
                    format!("'{}' is not null-checked and fails if the node is missing", node.path),
                    Severity::Info,
                )
                .with_suggestion(format!("get_node_or_null(\"{}\")", node.path)),
            );
        }
        None
    }
}

/// Variable name for caching a node path: the last segment in snake_case.
fn cache_name(path: &str) -> String {
    let last = path.rsplit('/').next().unwrap_or(path);
    let name = super::naming::to_snake_case(last.trim_start_matches('%'));
    if name.is_empty() {
        "node".to_string()
    } else {
        name
    }
}

impl Check for NodeRefs {
    fn id(&self) -> &'static str {
        "node_refs"
    }

    fn name(&self) -> &'static str {
        "Node references"
    }

    fn category(&self) -> Category {
        Category::Godot
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.unsafe")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let mut total = 0usize;
        let mut safe = 0usize;
        let mut onready = 0usize;
        let mut by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();

        for (file, facts) in ctx.project.sources() {
            let mut lookups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

            for node in &facts.node_refs {
                total += 1;
                *by_kind.entry(node.kind.as_str()).or_default() += 1;
                if node.safe {
                    safe += 1;
                }
                if node.onready {
                    onready += 1;
                } else if node.function.is_some() {
                    lookups.entry(node.path.as_str()).or_default().push(node.line);
                }
                if let Some(issue) = self.inspect(&file.rel_path, node) {
                    out.push(issue);
                }
            }

            for (path, lines) in lookups {
                if lines.len() < REPEAT_LIMIT {
                    continue;
                }
                out.push(
                    Issue::new(
                        self.id(),
                        &file.rel_path,
                        lines[0],
                        "repeated_node_lookup",
                        format!("'{}' is looked up {} times in this file", path, lines.len()),
                        Severity::Info,
                    )
                    .with_suggestion(format!("@onready var {} = ${}", cache_name(path), path)),
                );
            }
        }

        out.set("references", total);
        out.set("safe", safe);
        out.set("unsafe", total - safe);
        out.set("onready", onready);
        out.set("by_kind", serde_json::to_value(by_kind)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    #[test]
    fn test_node_ref_rules() {
        let src = "extends Node\n\
@onready var label = $UI/Label\n\
func _process(delta):\n\
\t$Player.position.x += 1\n\
func f():\n\
\tvar a = get_node(\"Bar\")\n\
\tvar b = get_node_or_null(\"Baz\")\n\
\tif $Sprite != null:\n\
\t\tpass\n\
\tfind_child(\"Icon\")\n";
        let out = testutil::run(&NodeRefs, &[("a.gd", src)]);
        let got: Vec<(usize, &str)> = out.issues.iter().map(|i| (i.line, i.issue_type.as_str())).collect();
        assert_eq!(
            got,
            vec![(4, "hot_path_node_lookup"), (6, "unsafe_node_ref"), (10, "find_child_usage")]
        );
        assert_eq!(out.issues[0].suggestion.as_deref(), Some("@onready var player = $Player"));
        assert_eq!(out.summary["references"], 6);
        assert_eq!(out.summary["onready"], 1);
    }

    #[test]
    fn test_repeated_lookup() {
        let src = "func f():\n\tget_node_or_null(\"Hud\")\n\tget_node_or_null(\"Hud\")\n\tget_node_or_null(\"Hud\")\n";
        let out = testutil::run(&NodeRefs, &[("a.gd", src)]);
        assert_eq!(testutil::types(&out), vec!["repeated_node_lookup"]);
        assert_eq!(out.issues[0].line, 2);
    }
}
