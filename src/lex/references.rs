//! Cross-file references: resource paths, class names, signal sites,
//! input actions and `Name.member` accesses.
//!
//! Node paths, await targets, dictionary keys and magic numbers are also
//! recorded as references so the index can account for every use site.
//! Signals connected through `Callable` objects or string variables are
//! not recognised.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::functions::{enclosing_function, FunctionDef};
use super::{code_part, is_inside_string_literal};

lazy_static! {
    static ref RES_STRING: Regex = Regex::new(r#"["'](res://[^"']+)["']"#).unwrap();
    static ref CLASS_USE: Regex = Regex::new(
        r"(?:\b(?:is|as|extends)\s+|:\s*|->\s*|\bArray\[)([A-Z][A-Za-z0-9_]*)\b|\b([A-Z][A-Za-z0-9_]*)\.new\s*\("
    )
    .unwrap();
    static ref EMIT_SIGNAL: Regex =
        Regex::new(r#"\bemit_signal\s*\(\s*["']([A-Za-z_][A-Za-z0-9_]*)["']"#).unwrap();
    static ref EMIT_METHOD: Regex = Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\.emit\s*\(").unwrap();
    static ref CONNECT_STRING: Regex =
        Regex::new(r#"\bconnect\s*\(\s*["']([A-Za-z_][A-Za-z0-9_]*)["']"#).unwrap();
    static ref CONNECT_METHOD: Regex =
        Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\.connect\s*\(").unwrap();
    static ref ACTION_CALL: Regex = Regex::new(
        r"\b(is_action_pressed|is_action_just_pressed|is_action_just_released|is_action_released|is_action|get_action_strength|get_action_raw_strength|has_action|action_press|action_release|get_axis|get_vector)\s*\(([^)]*)\)"
    )
    .unwrap();
    static ref QUOTED: Regex = Regex::new(r#"["']([^"']+)["']"#).unwrap();
    static ref QUALIFIED: Regex =
        Regex::new(r"\b([A-Z][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    ResourcePath,
    ClassName,
    SignalEmit,
    SignalConnect,
    NodePath,
    AwaitTarget,
    DictKey,
    MagicNumber,
    InputAction,
    AutoloadMember,
}

impl RefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefKind::ResourcePath => "resource_path",
            RefKind::ClassName => "class_name",
            RefKind::SignalEmit => "signal_emit",
            RefKind::SignalConnect => "signal_connect",
            RefKind::NodePath => "node_path",
            RefKind::AwaitTarget => "await_target",
            RefKind::DictKey => "dict_key",
            RefKind::MagicNumber => "magic_number",
            RefKind::InputAction => "input_action",
            RefKind::AutoloadMember => "autoload_member",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Reference {
    pub kind: RefKind,
    pub target: String,
    pub file: String,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

/// Number of action names taken from the arguments of an input call.
fn action_arity(call: &str) -> usize {
    match call {
        "get_axis" => 2,
        "get_vector" => 4,
        _ => 1,
    }
}

/// Extract references that need only the line text. Node paths, awaits,
/// dictionary keys and numbers are added by the index from the other
/// extractors.
pub fn extract_references(file: &str, lines: &[String], functions: &[FunctionDef]) -> Vec<Reference> {
    let mut refs = Vec::new();

    for (idx, raw) in lines.iter().enumerate() {
        let code = code_part(raw);
        if code.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let function = enclosing_function(functions, line_no)
            .filter(|f| f.line != line_no)
            .map(|f| f.name.clone());
        let mut push = |kind: RefKind, target: &str| {
            refs.push(Reference {
                kind,
                target: target.to_string(),
                file: file.to_string(),
                line: line_no,
                function: function.clone(),
            });
        };

        for caps in RES_STRING.captures_iter(code) {
            push(RefKind::ResourcePath, &caps[1]);
        }

        for caps in CLASS_USE.captures_iter(code) {
            let Some(m) = caps.get(1).or_else(|| caps.get(2)) else { continue };
            if is_inside_string_literal(code, m.start()) {
                continue;
            }
            push(RefKind::ClassName, m.as_str());
        }

        for caps in EMIT_SIGNAL.captures_iter(code) {
            push(RefKind::SignalEmit, &caps[1]);
        }
        for caps in EMIT_METHOD.captures_iter(code) {
            let Some(m) = caps.get(1) else { continue };
            if !is_inside_string_literal(code, m.start()) {
                push(RefKind::SignalEmit, m.as_str());
            }
        }
        for caps in CONNECT_STRING.captures_iter(code) {
            push(RefKind::SignalConnect, &caps[1]);
        }
        for caps in CONNECT_METHOD.captures_iter(code) {
            let Some(m) = caps.get(1) else { continue };
            if !is_inside_string_literal(code, m.start()) {
                push(RefKind::SignalConnect, m.as_str());
            }
        }

        for caps in ACTION_CALL.captures_iter(code) {
            let Some(m) = caps.get(0) else { continue };
            if is_inside_string_literal(code, m.start()) {
                continue;
            }
            for action in QUOTED.captures_iter(&caps[2]).take(action_arity(&caps[1])) {
                push(RefKind::InputAction, &action[1]);
            }
        }

        for caps in QUALIFIED.captures_iter(code) {
            let Some(m) = caps.get(0) else { continue };
            if is_inside_string_literal(code, m.start()) {
                continue;
            }
            push(RefKind::AutoloadMember, m.as_str());
        }
    }

    refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::extract_functions;

    fn extract(src: &str) -> Vec<Reference> {
        let lines: Vec<String> = src.lines().map(str::to_string).collect();
        let funcs = extract_functions(&lines);
        extract_references("game/a.gd", &lines, &funcs)
    }

    fn of_kind(refs: &[Reference], kind: RefKind) -> Vec<&str> {
        refs.iter().filter(|r| r.kind == kind).map(|r| r.target.as_str()).collect()
    }

    #[test]
    fn test_input_actions() {
        let refs = extract(
            "func _process(d):\n\tif Input.is_action_pressed(\"jump\"):\n\t\tpass\n\tvar x = Input.get_axis(\"move_left\", \"move_right\")\n",
        );
        assert_eq!(
            of_kind(&refs, RefKind::InputAction),
            vec!["jump", "move_left", "move_right"]
        );
        assert!(refs.iter().all(|r| r.function.as_deref() == Some("_process")));
    }

    #[test]
    fn test_signal_sites() {
        let refs = extract(
            "func f():\n\tdied.emit()\n\temit_signal(\"hit\", 3)\n\tbutton.pressed.connect(_on_pressed)\n\tconnect(\"timeout\", self, \"_t\")\n",
        );
        assert_eq!(of_kind(&refs, RefKind::SignalEmit), vec!["died", "hit"]);
        assert_eq!(of_kind(&refs, RefKind::SignalConnect), vec!["pressed", "timeout"]);
    }

    #[test]
    fn test_class_and_resource_refs() {
        let refs = extract(
            "var t: Tower = Tower.new()\nconst S = preload(\"res://sim/state.gd\")\nif x is Enemy:\n\tpass\n",
        );
        assert_eq!(of_kind(&refs, RefKind::ClassName), vec!["Tower", "Tower", "Enemy"]);
        assert_eq!(of_kind(&refs, RefKind::ResourcePath), vec!["res://sim/state.gd"]);
    }

    #[test]
    fn test_qualified_members() {
        let refs = extract("func f():\n\tAudio.play(\"x\")\n\t# Settings.volume\n");
        assert_eq!(of_kind(&refs, RefKind::AutoloadMember), vec!["Audio.play"]);
    }
}
