//! Dictionary access, string literals and numeric literals.
//!
//! Strings are recognised per line with `\` escapes; triple-quoted strings
//! spanning lines are treated as ordinary text. Numeric literals are only
//! collected inside function bodies, with string contents masked first.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::functions::{enclosing_function, FunctionDef};
use super::{code_part, is_inside_string_literal, mask_strings};

lazy_static! {
    static ref BRACKET_ACCESS: Regex = Regex::new(
        r#"([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*\[\s*(?:"([^"\\]+)"|'([^'\\]+)')\s*\]"#
    )
    .unwrap();
    static ref GET_ACCESS: Regex = Regex::new(
        r#"([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\.(get|has)\(\s*(?:"([^"\\]+)"|'([^'\\]+)')"#
    )
    .unwrap();
    static ref STRING: Regex =
        Regex::new(r#""((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'"#).unwrap();
    static ref ASSIGN_AFTER: Regex =
        Regex::new(r"^(?:\s*\[[^\]]*\])*\s*(?:=[^=]|[-+*/%|&^]=|<<=|>>=)").unwrap();
    static ref IF_CHECK: Regex = Regex::new(r"(?:^|[\s(])(?:if|elif)\b").unwrap();
    static ref SKIP_NUMBER_LINE: Regex =
        Regex::new(r"^\s*(?:const\b|enum\b|@|static\s+const\b)").unwrap();
}

/// Values never reported as magic numbers.
pub const ACCEPTABLE_NUMBERS: &[&str] = &[
    "0", "1", "2", "-1", "0.0", "1.0", "-1.0", "0.5", "2.0", "10", "100",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DictAccessForm {
    Bracket,
    Get,
    Has,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictAccess {
    /// Receiver expression, possibly dotted (`self.stats`).
    pub receiver: String,
    pub key: String,
    pub line: usize,
    /// 0-based byte offset of the receiver.
    pub column: usize,
    /// Byte offset just past the access (the closing `]`, or the key for
    /// `.get(`/`.has(`).
    pub end: usize,
    pub form: DictAccessForm,
    /// The access is the target of an assignment.
    pub is_assignment: bool,
    /// Same line carries a `.has(` or `in` membership guard.
    pub guarded: bool,
}

impl DictAccess {
    /// Last segment of the receiver.
    pub fn receiver_name(&self) -> &str {
        self.receiver.rsplit('.').next().unwrap_or(&self.receiver)
    }

    pub fn is_safe_form(&self) -> bool {
        self.form != DictAccessForm::Bracket
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    pub value: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberCategory {
    Timing,
    Geometry,
    Color,
    Gameplay,
    Generic,
}

impl NumberCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberCategory::Timing => "timing",
            NumberCategory::Geometry => "geometry",
            NumberCategory::Color => "color",
            NumberCategory::Gameplay => "gameplay",
            NumberCategory::Generic => "generic",
        }
    }

    fn from_line(code: &str) -> Self {
        let lower = code.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["timer", "wait", "delay", "duration", "seconds", "interval", "cooldown"]) {
            NumberCategory::Timing
        } else if has(&["color(", "modulate", "alpha"]) {
            NumberCategory::Color
        } else if has(&["vector2", "vector3", "position", "size", "offset", "scale", "rect2", "margin"]) {
            NumberCategory::Geometry
        } else if has(&["hp", "health", "damage", "gold", "score", "speed", "cost", "xp", "wave"]) {
            NumberCategory::Gameplay
        } else {
            NumberCategory::Generic
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericLiteral {
    /// Literal text as written, including a leading minus.
    pub value: String,
    pub line: usize,
    pub category: NumberCategory,
    pub function: Option<String>,
}

pub fn extract_dict_accesses(lines: &[String]) -> Vec<DictAccess> {
    let mut accesses = Vec::new();

    for (idx, raw) in lines.iter().enumerate() {
        let code = code_part(raw);
        if !(code.contains('[') || code.contains(".get(") || code.contains(".has(")) {
            continue;
        }
        let line_no = idx + 1;

        for caps in BRACKET_ACCESS.captures_iter(code) {
            let (Some(all), Some(recv)) = (caps.get(0), caps.get(1)) else { continue };
            if is_inside_string_literal(code, all.start()) {
                continue;
            }
            let key = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()).unwrap_or("");
            let after = &code[all.end()..];
            accesses.push(DictAccess {
                receiver: recv.as_str().to_string(),
                key: key.to_string(),
                line: line_no,
                column: recv.start(),
                end: all.end(),
                form: DictAccessForm::Bracket,
                is_assignment: ASSIGN_AFTER.is_match(after),
                guarded: is_guarded(code, key),
            });
        }

        for caps in GET_ACCESS.captures_iter(code) {
            let (Some(all), Some(recv)) = (caps.get(0), caps.get(1)) else { continue };
            if is_inside_string_literal(code, all.start()) {
                continue;
            }
            let key = caps.get(3).or_else(|| caps.get(4)).map(|m| m.as_str()).unwrap_or("");
            let form = if &caps[2] == "get" {
                DictAccessForm::Get
            } else {
                DictAccessForm::Has
            };
            accesses.push(DictAccess {
                receiver: recv.as_str().to_string(),
                key: key.to_string(),
                line: line_no,
                column: recv.start(),
                end: all.end(),
                form,
                is_assignment: false,
                guarded: true,
            });
        }
    }

    accesses.sort_by_key(|a| (a.line, a.column));
    accesses
}

/// A read is guarded by a `.has(` or `in` test on the same line, or by
/// sitting in an `if`/`elif` condition (ternaries included).
fn is_guarded(code: &str, key: &str) -> bool {
    code.contains(".has(")
        || IF_CHECK.is_match(&mask_strings(code))
        || code.contains(&format!("\"{}\" in ", key))
        || code.contains(&format!("'{}' in ", key))
}

/// String literals outside `const` definitions.
pub fn extract_strings(lines: &[String]) -> Vec<StringLiteral> {
    let mut strings = Vec::new();
    for (idx, raw) in lines.iter().enumerate() {
        let code = code_part(raw);
        if code.trim_start().starts_with("const ") {
            continue;
        }
        for caps in STRING.captures_iter(code) {
            let value = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
            strings.push(StringLiteral {
                value: value.to_string(),
                line: idx + 1,
            });
        }
    }
    strings
}

/// Numeric literals inside function bodies that are not in an acceptable
/// context (constants, enums, decorators, subscripts, common values).
pub fn extract_numbers(lines: &[String], functions: &[FunctionDef]) -> Vec<NumericLiteral> {
    let mut numbers = Vec::new();

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let Some(func) = enclosing_function(functions, line_no).filter(|f| f.line != line_no) else {
            continue;
        };
        let code = code_part(raw);
        if SKIP_NUMBER_LINE.is_match(code) {
            continue;
        }
        let masked = mask_strings(code);
        let category = NumberCategory::from_line(code);

        for (start, token) in number_tokens(&masked) {
            if ACCEPTABLE_NUMBERS.contains(&token.as_str()) {
                continue;
            }
            if is_subscript(&masked, start, token.len()) {
                continue;
            }
            numbers.push(NumericLiteral {
                value: token,
                line: line_no,
                category,
                function: Some(func.name.clone()),
            });
        }
    }

    numbers
}

/// Numeric tokens with their byte offsets. Digits inside identifiers
/// (`vec2`, `_1`) are skipped.
fn number_tokens(text: &str) -> Vec<(usize, String)> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if !b.is_ascii_digit() {
            i += 1;
            continue;
        }
        let prev = if i > 0 { bytes[i - 1] } else { b' ' };
        if prev.is_ascii_alphanumeric() || prev == b'_' || prev == b'.' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            continue;
        }

        let start = i;
        if b == b'0' && i + 1 < bytes.len() && (bytes[i + 1] == b'x' || bytes[i + 1] == b'b') {
            i += 2;
            while i < bytes.len() && (bytes[i].is_ascii_hexdigit() || bytes[i] == b'_') {
                i += 1;
            }
        } else {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
                i += 1;
            }
            if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j] == b'-' || bytes[j] == b'+') {
                    j += 1;
                }
                if j < bytes.len() && bytes[j].is_ascii_digit() {
                    i = j;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
        }
        // A trailing identifier character means this was not a number.
        if i < bytes.len() && (bytes[i].is_ascii_alphabetic() || bytes[i] == b'_') {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            continue;
        }

        let mut token_start = start;
        if is_unary_minus(bytes, start) {
            token_start = start - 1;
        }
        tokens.push((token_start, text[token_start..i].to_string()));
    }

    tokens
}

fn is_unary_minus(bytes: &[u8], start: usize) -> bool {
    if start == 0 || bytes[start - 1] != b'-' {
        return false;
    }
    let before = bytes[..start - 1].iter().rev().find(|b| !b.is_ascii_whitespace());
    matches!(before, None | Some(b'(' | b',' | b'=' | b'[' | b':' | b'<' | b'>' | b'+' | b'*' | b'/'))
}

fn is_subscript(text: &str, start: usize, len: usize) -> bool {
    let before = text[..start].trim_end();
    let after = text[start + len..].trim_start();
    before.ends_with('[') && after.starts_with(']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::extract_functions;

    fn lines(src: &str) -> Vec<String> {
        src.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_bracket_access_forms() {
        let src = lines(
            "var name = config[\"player_name\"]\nstats[\"hp\"] = 10\nif cfg.has(\"x\") and cfg[\"x\"]:\n\tpass\nvar v = self.meta.get('k', 0)\n",
        );
        let accesses = extract_dict_accesses(&src);
        assert_eq!(accesses.len(), 5);
        assert_eq!(accesses[0].receiver, "config");
        assert_eq!(accesses[0].key, "player_name");
        assert!(!accesses[0].is_assignment);
        assert!(!accesses[0].guarded);
        assert!(accesses[1].is_assignment);
        assert_eq!(accesses[2].form, DictAccessForm::Has);
        assert_eq!(accesses[3].form, DictAccessForm::Bracket);
        assert!(accesses[3].guarded);
        assert_eq!(accesses[4].form, DictAccessForm::Get);
        assert_eq!(accesses[4].receiver_name(), "meta");
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        let src = lines("if data[\"count\"] == 0:\n\tpass\nd[\"n\"] += 1\n");
        let accesses = extract_dict_accesses(&src);
        assert!(!accesses[0].is_assignment);
        assert!(accesses[1].is_assignment);
    }

    #[test]
    fn test_strings_skip_constants() {
        let src = lines("const A = \"skip\"\nvar b = \"keep\" + 'also'\n");
        let values: Vec<String> = extract_strings(&src).into_iter().map(|s| s.value).collect();
        assert_eq!(values, vec!["keep", "also"]);
    }

    #[test]
    fn test_numbers_in_functions_only() {
        let src = lines(
            "var speed = 300\nfunc f():\n\tvar t = get_tree().create_timer(0.75)\n\tvar v = Vector2(64, -32)\n\tarr[3] = 1\n\tprint(\"42\")\n",
        );
        let funcs = extract_functions(&src);
        let numbers = extract_numbers(&src, &funcs);
        let values: Vec<&str> = numbers.iter().map(|n| n.value.as_str()).collect();
        assert_eq!(values, vec!["0.75", "64", "-32"]);
        assert_eq!(numbers[0].category, NumberCategory::Timing);
        assert_eq!(numbers[1].category, NumberCategory::Geometry);
    }

    #[test]
    fn test_number_tokens_skip_identifiers() {
        let tokens = number_tokens("vec2 + x_3 + 0x1F + 1e3 + 3.14");
        let values: Vec<&str> = tokens.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(values, vec!["0x1F", "1e3", "3.14"]);
    }
}
