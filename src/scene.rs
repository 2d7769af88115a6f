//! Reader for `.tscn` scene descriptors.
//!
//! The format is INI-like: bracketed headers (`[ext_resource …]`,
//! `[node …]`, `[connection …]`) followed by `key = value` property lines.
//! Both the quoted ids of format 3 (`ExtResource("1_ab")`) and the bare
//! integers of older files (`ExtResource( 1 )`) are understood.

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::project::source::resolve_resource;

lazy_static! {
    static ref HEADER: Regex = Regex::new(r"^\[([a-z_]+)(.*)\]\s*$").unwrap();
    static ref ATTR: Regex =
        Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*("(?:[^"\\]|\\.)*"|[A-Za-z_]+\([^)]*\)|\[[^\]]*\]|[^\s\]]+)"#).unwrap();
    static ref EXT_REF: Regex = Regex::new(r#"ExtResource\(\s*"?([^")\s]+)"?\s*\)"#).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtResource {
    pub id: String,
    pub path: String,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    pub line: usize,
    /// Target file is present in the project (always true for `uid://`
    /// only references, which cannot be checked).
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub parent: Option<String>,
    pub depth: usize,
    /// Resolved `res://` path of the attached script.
    pub script: Option<String>,
    /// Resolved path of an instanced sub-scene.
    pub instance: Option<String>,
    pub line: usize,
    pub child_count: usize,
}

impl SceneNode {
    /// Path of this node relative to the scene root (`.` for the root).
    pub fn path(&self) -> String {
        match self.parent.as_deref() {
            None => ".".to_string(),
            Some(".") => self.name.clone(),
            Some(parent) => format!("{}/{}", parent, self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub signal: String,
    pub from: String,
    pub to: String,
    pub method: String,
    pub line: usize,
}

/// A problem found while reading a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneProblem {
    pub kind: SceneProblemKind,
    pub line: usize,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneProblemKind {
    MissingResource,
    DuplicateSibling,
    UnknownResourceId,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneFile {
    pub rel_path: String,
    pub ext_resources: BTreeMap<String, ExtResource>,
    pub nodes: Vec<SceneNode>,
    pub connections: Vec<Connection>,
    pub problems: Vec<SceneProblem>,
}

impl SceneFile {
    /// Parse scene text. `files` is the set of project-relative paths used
    /// for existence checks.
    pub fn parse(rel_path: &str, text: &str, files: &BTreeSet<String>) -> Self {
        let mut scene = SceneFile {
            rel_path: rel_path.to_string(),
            ..Default::default()
        };
        let lines: Vec<&str> = text.lines().collect();

        // First pass: external resources.
        for (idx, line) in lines.iter().enumerate() {
            let Some((section, attrs)) = parse_header(line) else { continue };
            if section != "ext_resource" {
                continue;
            }
            let Some(id) = attrs.get("id").cloned() else { continue };
            let path = attrs.get("path").cloned().unwrap_or_default();
            let exists = if path.is_empty() {
                true
            } else {
                match resolve_resource(rel_path, &path) {
                    Some(resolved) => files.contains(&resolved),
                    None => true,
                }
            };
            if !exists {
                scene.problems.push(SceneProblem {
                    kind: SceneProblemKind::MissingResource,
                    line: idx + 1,
                    detail: path.clone(),
                });
            }
            scene.ext_resources.insert(
                id.clone(),
                ExtResource {
                    id,
                    path,
                    resource_type: attrs.get("type").cloned(),
                    line: idx + 1,
                    exists,
                },
            );
        }

        // Second pass: nodes, scripts and connections.
        let mut current: Option<usize> = None;
        let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;
            if let Some((section, attrs)) = parse_header(line) {
                current = None;
                match section.as_str() {
                    "node" => {
                        let name = attrs.get("name").cloned().unwrap_or_default();
                        let parent = attrs.get("parent").cloned();
                        let depth = match parent.as_deref() {
                            None => 0,
                            Some(".") => 1,
                            Some(p) => p.matches('/').count() + 2,
                        };
                        let parent_key = parent.clone().unwrap_or_default();
                        if !seen.insert((parent_key.clone(), name.clone())) {
                            scene.problems.push(SceneProblem {
                                kind: SceneProblemKind::DuplicateSibling,
                                line: line_no,
                                detail: if parent_key.is_empty() {
                                    name.clone()
                                } else {
                                    format!("{}/{}", parent_key, name)
                                },
                            });
                        }
                        let instance = attrs
                            .get("instance")
                            .and_then(|v| scene.resolve_ext(v, line_no));
                        scene.nodes.push(SceneNode {
                            name,
                            node_type: attrs.get("type").cloned(),
                            parent,
                            depth,
                            script: None,
                            instance,
                            line: line_no,
                            child_count: 0,
                        });
                        current = Some(scene.nodes.len() - 1);
                    }
                    "connection" => {
                        scene.connections.push(Connection {
                            signal: attrs.get("signal").cloned().unwrap_or_default(),
                            from: attrs.get("from").cloned().unwrap_or_default(),
                            to: attrs.get("to").cloned().unwrap_or_default(),
                            method: attrs.get("method").cloned().unwrap_or_default(),
                            line: line_no,
                        });
                    }
                    _ => {}
                }
                continue;
            }

            let Some(node_idx) = current else { continue };
            let trimmed = line.trim();
            if let Some(value) = trimmed.strip_prefix("script") {
                let value = value.trim_start();
                if let Some(value) = value.strip_prefix('=') {
                    let script = scene.resolve_ext(value.trim(), line_no);
                    scene.nodes[node_idx].script = script;
                }
            }
        }

        scene.count_children();
        scene
    }

    /// Resolve an `ExtResource(id)` value, recording unknown ids.
    fn resolve_ext(&mut self, value: &str, line: usize) -> Option<String> {
        let caps = EXT_REF.captures(value)?;
        let id = caps[1].to_string();
        match self.ext_resources.get(&id) {
            Some(res) => Some(res.path.clone()),
            None => {
                self.problems.push(SceneProblem {
                    kind: SceneProblemKind::UnknownResourceId,
                    line,
                    detail: id,
                });
                None
            }
        }
    }

    fn count_children(&mut self) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for node in &self.nodes {
            if let Some(parent) = &node.parent {
                *counts.entry(parent.clone()).or_default() += 1;
            }
        }
        for node in &mut self.nodes {
            node.child_count = counts.get(&node.path()).copied().unwrap_or(0);
        }
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn root(&self) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.parent.is_none())
    }

    /// Scripts attached anywhere in the scene, resolved project-relative.
    pub fn scripts(&self) -> Vec<String> {
        let mut scripts: Vec<String> = self
            .nodes
            .iter()
            .filter_map(|n| n.script.as_deref())
            .filter_map(|s| resolve_resource(&self.rel_path, s))
            .collect();
        scripts.sort();
        scripts.dedup();
        scripts
    }
}

fn parse_header(line: &str) -> Option<(String, BTreeMap<String, String>)> {
    let caps = HEADER.captures(line.trim())?;
    let mut attrs = BTreeMap::new();
    for attr in ATTR.captures_iter(&caps[2]) {
        let raw = &attr[2];
        let value = if raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2 {
            raw[1..raw.len() - 1].to_string()
        } else {
            raw.to_string()
        };
        attrs.insert(attr[1].to_string(), value);
    }
    Some((caps[1].to_string(), attrs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"[gd_scene load_steps=3 format=3 uid="uid://abc"]

[ext_resource type="Script" path="res://ui/hud.gd" id="1_hud"]
[ext_resource type="Texture2D" path="res://art/missing.png" id="2_tex"]

[node name="Hud" type="Control"]
script = ExtResource("1_hud")

[node name="Panel" type="Panel" parent="."]

[node name="Label" type="Label" parent="Panel"]

[node name="Label" type="Label" parent="Panel"]

[node name="Icon" type="Sprite2D" parent="Panel/Label"]
texture = ExtResource("9_nope")
script = ExtResource("9_nope")

[connection signal="pressed" from="Panel" to="." method="_on_panel_pressed"]
"#;

    fn files() -> BTreeSet<String> {
        ["ui/hud.gd".to_string(), "ui/hud.tscn".to_string()].into_iter().collect()
    }

    #[test]
    fn test_depths_and_children() {
        let scene = SceneFile::parse("ui/hud.tscn", SCENE, &files());
        let depths: Vec<usize> = scene.nodes.iter().map(|n| n.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 3]);
        assert_eq!(scene.nodes[0].child_count, 1);
        assert_eq!(scene.nodes[1].child_count, 2);
        assert_eq!(scene.max_depth(), 3);
        assert_eq!(scene.root().unwrap().name, "Hud");
    }

    #[test]
    fn test_script_resolution() {
        let scene = SceneFile::parse("ui/hud.tscn", SCENE, &files());
        assert_eq!(scene.nodes[0].script.as_deref(), Some("res://ui/hud.gd"));
        assert_eq!(scene.scripts(), vec!["ui/hud.gd".to_string()]);
    }

    #[test]
    fn test_problems() {
        let scene = SceneFile::parse("ui/hud.tscn", SCENE, &files());
        let kinds: Vec<SceneProblemKind> = scene.problems.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SceneProblemKind::MissingResource,
                SceneProblemKind::DuplicateSibling,
                SceneProblemKind::UnknownResourceId,
            ]
        );
        assert_eq!(scene.problems[1].detail, "Panel/Label");
        assert!(!scene.ext_resources["2_tex"].exists);
    }

    #[test]
    fn test_connections() {
        let scene = SceneFile::parse("ui/hud.tscn", SCENE, &files());
        assert_eq!(scene.connections.len(), 1);
        assert_eq!(scene.connections[0].method, "_on_panel_pressed");
    }

    #[test]
    fn test_legacy_integer_ids() {
        let text = "[ext_resource path=\"res://a.gd\" type=\"Script\" id=1]\n[node name=\"A\" type=\"Node\"]\nscript = ExtResource( 1 )\n";
        let files: BTreeSet<String> = ["a.gd".to_string()].into_iter().collect();
        let scene = SceneFile::parse("a.tscn", text, &files);
        assert_eq!(scene.nodes[0].script.as_deref(), Some("res://a.gd"));
        assert!(scene.problems.is_empty());
    }
}
