//! Naming conventions: snake_case members, SCREAMING_SNAKE constants,
//! PascalCase classes.
//!
//! Suggestions are built so that substituting one back in passes the same
//! rule.

use lazy_static::lazy_static;
use phf::phf_set;
use regex::Regex;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::lex::{DeclKind, Declaration};

/// Engine callbacks. Exempt from naming, visibility and dead-code rules.
pub static LIFECYCLE_HOOKS: phf::Set<&'static str> = phf_set! {
    "_ready", "_process", "_physics_process", "_input", "_unhandled_input",
    "_unhandled_key_input", "_gui_input", "_draw", "_enter_tree", "_exit_tree",
    "_notification", "_init", "_get", "_set", "_get_property_list",
    "_to_string", "_static_init", "_shortcut_input", "_validate_property",
    "_can_drop_data", "_drop_data", "_get_drag_data", "_make_custom_tooltip",
    "_integrate_forces", "_get_configuration_warnings",
};

/// Frame callbacks.
pub static HOT_PATH_HOOKS: phf::Set<&'static str> = phf_set! {
    "_process", "_physics_process", "_input", "_unhandled_input", "_draw",
};

/// Conventional short names accepted regardless of case.
pub static SHORT_NAMES: phf::Set<&'static str> = phf_set! {
    "x", "y", "z", "w", "i", "j", "k", "n", "id", "hp", "mp", "ap", "ui",
    "io", "db", "ok", "PI", "TAU",
};

lazy_static! {
    static ref SNAKE: Regex = Regex::new(r"^_*[a-z][a-z0-9]*(?:_+[a-z0-9]+)*_*$").unwrap();
    static ref SCREAMING: Regex = Regex::new(r"^_*[A-Z][A-Z0-9]*(?:_+[A-Z0-9]+)*_*$").unwrap();
    static ref PASCAL: Regex = Regex::new(r"^_?[A-Z][A-Za-z0-9]*$").unwrap();
    static ref LOAD_VALUE: Regex = Regex::new(r"^(?:preload|load)\s*\(").unwrap();
}

pub fn is_snake_case(name: &str) -> bool {
    SNAKE.is_match(name)
}

pub fn is_screaming_snake_case(name: &str) -> bool {
    SCREAMING.is_match(name)
}

pub fn is_pascal_case(name: &str) -> bool {
    PASCAL.is_match(name)
}

/// Split an identifier into words at underscores and case boundaries.
/// Acronyms stay together (`HTTPRequest` → `HTTP`, `Request`); digits stick
/// to the preceding word.
pub fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || !(c.is_alphanumeric()) {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn leading_underscores(name: &str) -> &str {
    let end = name.len() - name.trim_start_matches('_').len();
    &name[..end]
}

/// `snake_case` form keeping any leading underscores.
pub fn to_snake_case(name: &str) -> String {
    let words: Vec<String> = split_words(name).iter().map(|w| w.to_lowercase()).collect();
    let mut body = words.join("_");
    if body.is_empty() || body.starts_with(|c: char| c.is_ascii_digit()) {
        body = format!("v_{}", body);
    }
    format!("{}{}", leading_underscores(name), body.trim_end_matches('_'))
}

pub fn to_screaming_snake_case(name: &str) -> String {
    to_snake_case(name).to_uppercase()
}

/// `PascalCase` form; leading underscores are dropped.
pub fn to_pascal_case(name: &str) -> String {
    let mut out = String::new();
    for word in split_words(name) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&soften(chars.as_str()));
        }
    }
    if !out.starts_with(|c: char| c.is_ascii_uppercase()) {
        out.insert(0, 'C');
    }
    out
}

/// Lowercase the tail of a word only when it is all caps, so `HUD`
/// becomes `Hud` while `Request` is untouched.
fn soften(tail: &str) -> String {
    if tail.chars().any(|c| c.is_lowercase()) {
        tail.to_string()
    } else {
        tail.to_lowercase()
    }
}

/// Class name expected for a script file stem.
pub fn class_name_for_stem(stem: &str) -> String {
    to_pascal_case(stem)
}

pub struct Naming;

/// A violated rule: issue type, expected style and suggestion.
fn violation(decl: &Declaration, extra: &[String]) -> Option<(&'static str, &'static str, String)> {
    let name = decl.name.as_str();
    if SHORT_NAMES.contains(name) || extra.iter().any(|e| e == name) {
        return None;
    }
    match decl.kind {
        DeclKind::Function => {
            if LIFECYCLE_HOOKS.contains(name) || is_snake_case(name) {
                None
            } else {
                Some(("function_naming", "snake_case", to_snake_case(name)))
            }
        }
        DeclKind::Variable | DeclKind::Export => {
            (!is_snake_case(name)).then(|| ("variable_naming", "snake_case", to_snake_case(name)))
        }
        DeclKind::Signal => (!is_snake_case(name)).then(|| ("signal_naming", "snake_case", to_snake_case(name))),
        DeclKind::Constant => {
            let is_class_alias = decl
                .value
                .as_deref()
                .is_some_and(|v| LOAD_VALUE.is_match(v.trim()));
            if is_screaming_snake_case(name) || (is_class_alias && is_pascal_case(name)) {
                None
            } else {
                Some(("constant_naming", "SCREAMING_SNAKE_CASE", to_screaming_snake_case(name)))
            }
        }
        DeclKind::EnumValue => (!is_screaming_snake_case(name))
            .then(|| ("enum_value_naming", "SCREAMING_SNAKE_CASE", to_screaming_snake_case(name))),
        DeclKind::Class | DeclKind::InnerClass | DeclKind::Enum => {
            (!is_pascal_case(name)).then(|| ("class_naming", "PascalCase", to_pascal_case(name)))
        }
    }
}

impl Check for Naming {
    fn id(&self) -> &'static str {
        "naming"
    }

    fn name(&self) -> &'static str {
        "Naming conventions"
    }

    fn category(&self) -> Category {
        Category::Naming
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.issues")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let extra = &ctx.project.config.naming.extra_exceptions;
        let mut checked = 0usize;

        for (file, facts) in ctx.project.sources() {
            for decl in &facts.declarations {
                // Locals are out of scope; only members and functions.
                if decl.function.is_some() {
                    continue;
                }
                checked += 1;
                if let Some((issue_type, style, suggestion)) = violation(decl, extra) {
                    out.push(
                        Issue::new(
                            self.id(),
                            &file.rel_path,
                            decl.line,
                            issue_type,
                            format!("{} '{}' should be {}", decl.kind.as_str(), decl.name, style),
                            Severity::Warning,
                        )
                        .with_suggestion(suggestion),
                    );
                }
            }
        }

        out.set("declarations", checked);
        out.set("by_type", serde_json::to_value(super::type_counts(&out.issues))?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("HTTPRequest"), vec!["HTTP", "Request"]);
        assert_eq!(split_words("maxHP2"), vec!["max", "HP2"]);
        assert_eq!(split_words("_on_button_pressed"), vec!["on", "button", "pressed"]);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(to_snake_case("playerHealth"), "player_health");
        assert_eq!(to_snake_case("_OnPressed"), "_on_pressed");
        assert_eq!(to_screaming_snake_case("maxSpeed"), "MAX_SPEED");
        assert_eq!(to_pascal_case("game_state"), "GameState");
        assert_eq!(to_pascal_case("HUD_panel"), "HudPanel");
    }

    #[test]
    fn test_suggestions_are_fixed_points() {
        for name in ["playerHealth", "Max_speed", "XMLThing", "a__b", "_Private", "tower2Upgrade"] {
            assert!(is_snake_case(&to_snake_case(name)), "{}", name);
            assert!(is_screaming_snake_case(&to_screaming_snake_case(name)), "{}", name);
            assert!(is_pascal_case(&to_pascal_case(name)), "{}", name);
        }
    }

    #[test]
    fn test_pascal_to_snake_round_trip() {
        for stem in ["game_state", "tower_defense", "hud"] {
            assert_eq!(to_snake_case(&to_pascal_case(stem)), stem);
        }
    }

    #[test]
    fn test_naming_violations() {
        let out = testutil::run(
            &Naming,
            &[(
                "sim/state.gd",
                "class_name game_state\nextends RefCounted\n\nsignal WaveStarted\nconst maxWaves = 10\nconst Tower = preload(\"res://sim/tower.gd\")\nvar PI = 3\nvar playerHp = 1\n\nfunc _ready():\n\tpass\n\nfunc DoThing():\n\tvar LocalX = 1\n",
            )],
        );
        let got: Vec<(&str, Option<&str>)> = out
            .issues
            .iter()
            .map(|i| (i.issue_type.as_str(), i.suggestion.as_deref()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("class_naming", Some("GameState")),
                ("signal_naming", Some("wave_started")),
                ("constant_naming", Some("MAX_WAVES")),
                ("variable_naming", Some("player_hp")),
                ("function_naming", Some("do_thing")),
            ]
        );
    }
}
