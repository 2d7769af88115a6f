//! Table-driven line rules for engine API pitfalls.
//!
//! Rules run against the code part of each line (comments stripped) and
//! skip matches that start inside a string literal. Function headers are
//! not scanned. Scoped rules only fire inside the named callbacks.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::naming::HOT_PATH_HOOKS;
use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::lex::{code_part, enclosing_function, is_inside_string_literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bucket {
    Deprecated,
    Mistakes,
    Performance,
    Lifecycle,
    Strict,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Deprecated => "deprecated",
            Bucket::Mistakes => "mistakes",
            Bucket::Performance => "performance",
            Bucket::Lifecycle => "lifecycle",
            Bucket::Strict => "strict",
        }
    }
}

/// Where a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Anywhere,
    /// Per-frame callbacks.
    HotPath,
    /// `_init`, before the node enters the tree.
    Init,
}

#[derive(Debug)]
pub struct Rule {
    pub id: &'static str,
    pub bucket: Bucket,
    pub scope: Scope,
    pub pattern: &'static str,
    pub message: &'static str,
    pub severity: Severity,
    pub suggestion: Option<&'static str>,
}

macro_rules! rule {
    ($id:literal, $bucket:ident, $scope:ident, $pattern:literal, $message:literal, $severity:ident) => {
        Rule {
            id: $id,
            bucket: Bucket::$bucket,
            scope: Scope::$scope,
            pattern: $pattern,
            message: $message,
            severity: Severity::$severity,
            suggestion: None,
        }
    };
    ($id:literal, $bucket:ident, $scope:ident, $pattern:literal, $message:literal, $severity:ident, $suggestion:literal) => {
        Rule {
            id: $id,
            bucket: Bucket::$bucket,
            scope: Scope::$scope,
            pattern: $pattern,
            message: $message,
            severity: Severity::$severity,
            suggestion: Some($suggestion),
        }
    };
}

pub static RULES: &[Rule] = &[
    // Godot 3 APIs and syntax.
    rule!("yield", Deprecated, Anywhere, r"\byield\s*\(", "yield() was replaced by await", Warning, "await signal"),
    rule!("setget", Deprecated, Anywhere, r"\bsetget\b", "setget was replaced by property accessors", Warning, "var x: int: set = _set_x, get = _get_x"),
    rule!("bare_onready", Deprecated, Anywhere, r"(?:^|[^@\w])onready\s+var\b", "onready keyword is now the @onready annotation", Warning, "@onready var"),
    rule!("bare_export", Deprecated, Anywhere, r"^\s*export\s*(?:\(|var\b)", "export keyword is now the @export annotation", Warning, "@export var"),
    rule!("bare_tool", Deprecated, Anywhere, r"^tool\s*$", "tool keyword is now the @tool annotation", Warning, "@tool"),
    rule!("kinematic_body", Deprecated, Anywhere, r"\bKinematicBody(?:2D)?\b", "KinematicBody was renamed to CharacterBody", Warning, "CharacterBody2D / CharacterBody3D"),
    rule!("spatial", Deprecated, Anywhere, r"\bSpatial\b", "Spatial was renamed to Node3D", Warning, "Node3D"),
    rule!("pool_array", Deprecated, Anywhere, r"\bPool(?:String|Int|Real|Byte|Vector2|Vector3|Color)Array\b", "Pool*Array types were renamed to Packed*Array", Warning, "PackedStringArray"),
    rule!("funcref", Deprecated, Anywhere, r"\bfuncref\s*\(", "funcref() was replaced by Callable", Warning, "Callable(object, \"method\")"),
    rule!("string_connect", Deprecated, Anywhere, r#"\bconnect\s*\(\s*["'][^"']+["']\s*,\s*self\b"#, "string-based connect() with a target object is Godot 3 style", Warning, "signal_name.connect(_on_signal)"),
    rule!("instance_call", Deprecated, Anywhere, r"\.instance\s*\(\s*\)", "PackedScene.instance() was renamed to instantiate()", Warning, "scene.instantiate()"),
    rule!("os_ticks", Deprecated, Anywhere, r"\bOS\.get_(?:ticks_msec|ticks_usec|unix_time|datetime)\s*\(", "time queries moved from OS to Time", Warning, "Time.get_ticks_msec()"),
    rule!("visual_server", Deprecated, Anywhere, r"\bVisualServer\b", "VisualServer was renamed to RenderingServer", Warning, "RenderingServer"),
    rule!("rpc_keyword", Deprecated, Anywhere, r"^\s*(?:remote|master|puppet|remotesync|mastersync|puppetsync)\s+func\b", "RPC keywords were replaced by the @rpc annotation", Warning, "@rpc(\"any_peer\")"),
    rule!("rand_range", Deprecated, Anywhere, r"\brand_range\s*\(", "rand_range() was replaced by randf_range()", Warning, "randf_range(a, b)"),
    rule!("stepify", Deprecated, Anywhere, r"\bstepify\s*\(", "stepify() was renamed to snapped()", Warning, "snapped(value, step)"),
    rule!("empty_call", Deprecated, Anywhere, r"\.empty\s*\(\s*\)", "empty() was renamed to is_empty()", Warning, ".is_empty()"),
    rule!("change_scene", Deprecated, Anywhere, r"\.change_scene\s*\(", "change_scene() was renamed to change_scene_to_file()", Warning, "get_tree().change_scene_to_file(path)"),
    rule!("emit_signal_string", Deprecated, Anywhere, r#"\bemit_signal\s*\(\s*["']"#, "string-based emit_signal() bypasses signal checking", Info, "signal_name.emit()"),
    // Common mistakes.
    rule!("node_free", Mistakes, Anywhere, r"(?:^\s*|\bself\.)free\s*\(\s*\)", "free() on a node can crash while it is processing", Warning, "queue_free()"),
    rule!("parent_chain", Mistakes, Anywhere, r"\bget_parent\s*\(\s*\)\s*\.\s*get_parent\s*\(", "chained get_parent() couples the script to the scene layout", Warning, "export a NodePath or emit a signal upward"),
    rule!("relative_up_path", Mistakes, Anywhere, r#"\bget_node\s*\(\s*["']\.\./"#, "get_node(\"../…\") depends on the parent layout", Info, "export a NodePath"),
    rule!("root_lookup", Mistakes, Anywhere, r"\bget_tree\s*\(\s*\)\s*\.\s*root\s*\.\s*get_node\s*\(", "looking up globals through the scene root", Warning, "use an autoload"),
    rule!("self_valid", Mistakes, Anywhere, r"\bis_instance_valid\s*\(\s*self\s*\)", "is_instance_valid(self) is always true", Info),
    rule!("bool_compare", Mistakes, Anywhere, r"[!=]=\s*(?:true|false)\b", "comparison against a boolean literal", Info, "use the value (or `not value`) directly"),
    rule!("str_literal", Mistakes, Anywhere, r#"\bstr\s*\(\s*"[^"]*"\s*\)"#, "str() of a string literal is redundant", Info),
    rule!("self_assign", Mistakes, Anywhere, r"^\s*([A-Za-z_][A-Za-z0-9_.]*)\s*=\s*([A-Za-z_][A-Za-z0-9_.]*)\s*$", "", Warning),
    rule!("hot_connect", Mistakes, HotPath, r"\.connect\s*\(", "signal connected every frame", Warning, "connect once in _ready()"),
    // Per-frame costs.
    rule!("hot_load", Performance, HotPath, r"\bload\s*\(", "load() runs every frame", Warning, "preload() into a constant"),
    rule!("hot_group_lookup", Performance, HotPath, r"\bget_nodes_in_group\s*\(", "group lookup every frame", Warning, "cache the group members and update on change"),
    rule!("hot_find_child", Performance, HotPath, r"\bfind_child(?:ren)?\s*\(", "recursive node search every frame", Warning, "cache the node in an @onready var"),
    rule!("hot_allocation", Performance, HotPath, r"\b[A-Z][A-Za-z0-9_]*\.new\s*\(", "object allocated every frame", Info, "reuse an instance"),
    rule!("hot_children", Performance, HotPath, r"\bget_children\s*\(\s*\)", "get_children() allocates an array every frame", Info),
    rule!("hot_duplicate", Performance, HotPath, r"\.duplicate\s*\(", "duplicate() copies every frame", Info),
    rule!("hot_json", Performance, HotPath, r"\bJSON\.(?:parse_string|stringify)\s*\(|\bJSON\.new\s*\(", "JSON work every frame", Warning, "parse once and cache"),
    rule!("hot_file", Performance, HotPath, r"\bFileAccess\.open\s*\(", "file access every frame", Warning),
    rule!("hot_rng", Performance, HotPath, r"\bRandomNumberGenerator\.new\s*\(", "random generator created every frame", Info, "create one RandomNumberGenerator as a member"),
    // Lifecycle ordering.
    rule!("init_node_lookup", Lifecycle, Init, r#"\bget_node(?:_or_null)?\s*\(|\$[A-Za-z"%]"#, "node lookup in _init() runs before the node is in the tree", Warning, "move to _ready() or an @onready var"),
    rule!("init_tree", Lifecycle, Init, r"\bget_tree\s*\(\s*\)", "get_tree() is null in _init()", Warning, "move to _ready()"),
    rule!("init_parent", Lifecycle, Init, r"\bget_parent\s*\(\s*\)", "get_parent() is null in _init()", Warning, "move to _ready()"),
    rule!("manual_callback", Lifecycle, Anywhere, r"(?:^|[\s(=,])(?:self\.)?_(?:ready|enter_tree|exit_tree|process|physics_process)\s*\(", "engine callbacks should not be called directly", Warning, "extract the body into a named function"),
    // Strict mode only.
    rule!("debug_print", Strict, Anywhere, r"\bprint(?:s|t|_debug|_rich)?\s*\(", "debug print", Info),
    rule!("assertion", Strict, Anywhere, r"\bassert\s*\(", "assertions are stripped from release builds", Info),
    rule!("breakpoint", Strict, Anywhere, r"\bbreakpoint\b", "breakpoint left in code", Warning),
    rule!("untyped_var", Strict, Anywhere, r"^\s*var\s+[A-Za-z_][A-Za-z0-9_]*\s*=[^=]", "variable without a type annotation", Info, "var name: Type = value or var name := value"),
];

static COMPILED: Lazy<Vec<Regex>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|r| Regex::new(r.pattern).unwrap())
        .collect()
});

/// Message for a rule match. `self_assign` only fires when both sides are
/// the same expression.
fn describe(rule: &Rule, caps: &regex::Captures<'_>) -> Option<String> {
    if rule.id == "self_assign" {
        let (lhs, rhs) = (caps.get(1)?.as_str(), caps.get(2)?.as_str());
        return (lhs == rhs).then(|| format!("'{}' is assigned to itself", lhs));
    }
    Some(rule.message.to_string())
}

pub struct GodotPatterns;

impl Check for GodotPatterns {
    fn id(&self) -> &'static str {
        "godot_patterns"
    }

    fn name(&self) -> &'static str {
        "Godot patterns"
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
        let active: Vec<(&Rule, &Regex)> = RULES
            .iter()
            .zip(COMPILED.iter())
            .filter(|(r, _)| ctx.options.strict || r.bucket != Bucket::Strict)
            .collect();
        let mut by_bucket: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut by_rule: BTreeMap<&'static str, usize> = BTreeMap::new();

        for (file, facts) in ctx.project.sources() {
            for (idx, raw) in file.lines.iter().enumerate() {
                let line_no = idx + 1;
                let code = code_part(raw);
                let trimmed = code.trim_start();
                if trimmed.is_empty() || trimmed.starts_with("func ") || trimmed.starts_with("static func ") {
                    continue;
                }
                let function = enclosing_function(&facts.functions, line_no).map(|f| f.name.as_str());

                for (rule, regex) in &active {
                    let in_scope = match rule.scope {
                        Scope::Anywhere => true,
                        Scope::HotPath => function.is_some_and(|f| HOT_PATH_HOOKS.contains(f)),
                        Scope::Init => function == Some("_init"),
                    };
                    if !in_scope {
                        continue;
                    }
                    let Some(caps) = regex.captures(code) else { continue };
                    let Some(m) = caps.get(0) else { continue };
                    if is_inside_string_literal(code, m.start()) {
                        continue;
                    }
                    let Some(message) = describe(rule, &caps) else { continue };

                    *by_bucket.entry(rule.bucket.as_str()).or_default() += 1;
                    *by_rule.entry(rule.id).or_default() += 1;
                    let mut issue = Issue::new(self.id(), &file.rel_path, line_no, rule.id, message, rule.severity)
                        .with_category(rule.bucket.as_str());
                    if let Some(s) = rule.suggestion {
                        issue = issue.with_suggestion(s);
                    }
                    out.push(issue);
                }
            }
        }

        out.set("rules", active.len());
        out.set("issues", out.issues.len());
        out.set("by_bucket", serde_json::to_value(by_bucket)?);
        out.set("by_rule", serde_json::to_value(by_rule)?);
        out.set("by_severity", serde_json::to_value(super::severity_counts(&out.issues))?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    #[test]
    fn test_rule_table_compiles() {
        assert_eq!(COMPILED.len(), RULES.len());
        assert!(RULES.len() >= 40);
        let ids: std::collections::BTreeSet<&str> = RULES.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), RULES.len());
    }

    #[test]
    fn test_deprecated_and_mistakes() {
        let src = "extends KinematicBody2D\n\
onready var sprite = $Sprite\n\
func f():\n\
\tyield(get_tree(), \"idle_frame\")\n\
\tvar s = \"yield(\"\n\
\t# yield(x)\n\
\tif ready == true:\n\
\t\tspeed = speed\n";
        let out = testutil::run(&GodotPatterns, &[("a.gd", src)]);
        let got: Vec<(usize, &str)> = out.issues.iter().map(|i| (i.line, i.issue_type.as_str())).collect();
        assert_eq!(
            got,
            vec![(1, "kinematic_body"), (2, "bare_onready"), (4, "yield"), (7, "bool_compare"), (8, "self_assign")]
        );
        assert_eq!(out.issues[0].category.as_deref(), Some("deprecated"));
        assert_eq!(out.summary["by_bucket"]["deprecated"], 3);
    }

    #[test]
    fn test_scoped_rules() {
        let src = "extends Node\n\
func _init():\n\
\tvar p = get_parent()\n\
func _process(delta):\n\
\tvar t = load(\"res://a.tres\")\n\
func helper():\n\
\tvar t = load(\"res://a.tres\")\n\
\tvar p = get_parent()\n";
        let out = testutil::run(&GodotPatterns, &[("a.gd", src)]);
        let got: Vec<(usize, &str)> = out.issues.iter().map(|i| (i.line, i.issue_type.as_str())).collect();
        assert_eq!(got, vec![(3, "init_parent"), (5, "hot_load")]);
    }

    #[test]
    fn test_strict_bucket() {
        let src = "func f():\n\tprint(\"x\")\n";
        assert!(testutil::run(&GodotPatterns, &[("a.gd", src)]).issues.is_empty());
        let out = testutil::strict(&GodotPatterns, &[("a.gd", src)]);
        assert_eq!(testutil::types(&out), vec!["debug_print"]);
    }
}
