//! Node path references: `$Path`, `%Unique`, `get_node`,
//! `get_node_or_null` and `find_child`.
//!
//! Paths built at runtime (`get_node(path_var)`) are not captured. A null
//! check is recognised only on the same line as the reference.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::functions::{enclosing_function, FunctionDef};
use super::{code_part, is_inside_string_literal};

lazy_static! {
    static ref DOLLAR: Regex = Regex::new(r#"\$("[^"]+"|%?[A-Za-z0-9_]+(?:/%?[A-Za-z0-9_]+)*)"#).unwrap();
    static ref UNIQUE: Regex = Regex::new(r"(?:^|[\s(=,\[])%([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    static ref CALL: Regex = Regex::new(
        r#"\b(get_node_or_null|get_node|find_child)\s*\(\s*["']([^"']+)["']"#
    )
    .unwrap();
    static ref NULL_CHECK: Regex =
        Regex::new(r"[!=]=\s*null\b|\bis_instance_valid\s*\(|\bhas_node\s*\(|\bif\s+(?:not\s+)?[$%]")
            .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRefKind {
    Dollar,
    Unique,
    GetNode,
    GetNodeOrNull,
    FindChild,
}

impl NodeRefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRefKind::Dollar => "dollar",
            NodeRefKind::Unique => "unique",
            NodeRefKind::GetNode => "get_node",
            NodeRefKind::GetNodeOrNull => "get_node_or_null",
            NodeRefKind::FindChild => "find_child",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub kind: NodeRefKind,
    pub path: String,
    pub line: usize,
    /// `get_node_or_null`, `@onready`, or a same-line null check.
    pub safe: bool,
    pub onready: bool,
    pub function: Option<String>,
}

pub fn extract_node_refs(lines: &[String], functions: &[FunctionDef]) -> Vec<NodeRef> {
    let mut refs = Vec::new();

    for (idx, raw) in lines.iter().enumerate() {
        let code = code_part(raw);
        if !(code.contains('$') || code.contains('%') || code.contains("get_node") || code.contains("find_child")) {
            continue;
        }
        let line_no = idx + 1;
        let onready = code.contains("@onready");
        let null_checked = NULL_CHECK.is_match(code);
        let function = enclosing_function(functions, line_no)
            .filter(|f| f.line != line_no)
            .map(|f| f.name.clone());

        let mut found: Vec<(usize, NodeRefKind, String)> = Vec::new();

        for caps in DOLLAR.captures_iter(code) {
            let (Some(all), Some(path)) = (caps.get(0), caps.get(1)) else { continue };
            if is_inside_string_literal(code, all.start()) {
                continue;
            }
            let path = path.as_str().trim_matches('"');
            found.push((all.start(), NodeRefKind::Dollar, path.to_string()));
        }
        for caps in UNIQUE.captures_iter(code) {
            let Some(name) = caps.get(1) else { continue };
            if is_inside_string_literal(code, name.start()) {
                continue;
            }
            found.push((name.start(), NodeRefKind::Unique, name.as_str().to_string()));
        }
        for caps in CALL.captures_iter(code) {
            let Some(all) = caps.get(0) else { continue };
            if is_inside_string_literal(code, all.start()) {
                continue;
            }
            let kind = match &caps[1] {
                "get_node_or_null" => NodeRefKind::GetNodeOrNull,
                "find_child" => NodeRefKind::FindChild,
                _ => NodeRefKind::GetNode,
            };
            found.push((all.start(), kind, caps[2].to_string()));
        }

        found.sort_by_key(|(col, _, _)| *col);
        for (_, kind, path) in found {
            refs.push(NodeRef {
                safe: kind == NodeRefKind::GetNodeOrNull || onready || null_checked,
                kind,
                path,
                line: line_no,
                onready,
                function: function.clone(),
            });
        }
    }

    refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::extract_functions;

    fn extract(src: &str) -> Vec<NodeRef> {
        let lines: Vec<String> = src.lines().map(str::to_string).collect();
        let funcs = extract_functions(&lines);
        extract_node_refs(&lines, &funcs)
    }

    #[test]
    fn test_classification() {
        let src = "@onready var label = $UI/Label\nfunc f():\n\tvar a = get_node(\"Bar\")\n\tvar b = get_node_or_null(\"Baz\")\n\t%Score.text = \"1\"\n\tfind_child(\"Icon\")\n";
        let refs = extract(src);
        let kinds: Vec<NodeRefKind> = refs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeRefKind::Dollar,
                NodeRefKind::GetNode,
                NodeRefKind::GetNodeOrNull,
                NodeRefKind::Unique,
                NodeRefKind::FindChild
            ]
        );
        assert_eq!(refs[0].path, "UI/Label");
        assert!(refs[0].safe && refs[0].onready);
        assert!(!refs[1].safe);
        assert!(refs[2].safe);
        assert_eq!(refs[3].path, "Score");
        assert_eq!(refs[4].function.as_deref(), Some("f"));
    }

    #[test]
    fn test_null_check_on_same_line_is_safe() {
        let refs = extract("func f():\n\tif $Sprite != null:\n\t\tpass\n");
        assert_eq!(refs.len(), 1);
        assert!(refs[0].safe);
    }

    #[test]
    fn test_ignores_strings_and_modulo() {
        let refs = extract("var s = \"costs $5\"\nvar m = a % b\nvar f = \"%d\" % n\n");
        assert!(refs.is_empty());
    }
}
