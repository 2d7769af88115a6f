//! Declarations: `class_name`, `extends`, inner classes, constants,
//! variables (with decorators), signals and enums.
//!
//! Decorators standing alone on the line(s) above a `var` are attached to
//! it. Enum bodies may span lines; values are read up to the closing brace.
//! Setter/getter blocks after a property are not parsed.

use lazy_static::lazy_static;
use regex::Regex;

use super::functions::{enclosing_function, FunctionDef};
use super::{code_part, indent_width};

lazy_static! {
    static ref CLASS_NAME: Regex = Regex::new(
        r#"^class_name\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s*,\s*"[^"]*")?(?:\s+extends\s+(\S+))?"#
    )
    .unwrap();
    static ref EXTENDS: Regex = Regex::new(r#"^extends\s+("[^"]+"|'[^']+'|[A-Za-z_][A-Za-z0-9_.]*)"#).unwrap();
    static ref INNER_CLASS: Regex = Regex::new(
        r#"^(\s*)class\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s+extends\s+("[^"]+"|[A-Za-z_][A-Za-z0-9_.]*))?\s*:"#
    )
    .unwrap();
    static ref CONSTANT: Regex = Regex::new(
        r"^(\s*)(?:static\s+)?const\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*([A-Za-z_][A-Za-z0-9_\[\].]*))?\s*:?=\s*(.*)$"
    )
    .unwrap();
    static ref VARIABLE: Regex = Regex::new(
        r"^(\s*)((?:@[A-Za-z_][A-Za-z0-9_]*(?:\([^)]*\))?\s+)*)(static\s+)?var\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*([A-Za-z_][A-Za-z0-9_\[\].]*))?\s*(?::?=\s*(.*))?"
    )
    .unwrap();
    static ref SIGNAL: Regex =
        Regex::new(r"^(\s*)signal\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    static ref ENUM: Regex =
        Regex::new(r"^(\s*)enum\s*([A-Za-z_][A-Za-z0-9_]*)?\s*\{(.*)$").unwrap();
    static ref DECORATOR: Regex =
        Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)(?:\(([^)]*)\))?").unwrap();
    static ref DECORATOR_ONLY: Regex =
        Regex::new(r"^\s*(?:@[A-Za-z_][A-Za-z0-9_]*(?:\([^)]*\))?\s*)+$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclKind {
    Function,
    Class,
    InnerClass,
    Constant,
    Variable,
    Signal,
    Enum,
    EnumValue,
    Export,
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Function => "function",
            DeclKind::Class => "class",
            DeclKind::InnerClass => "inner_class",
            DeclKind::Constant => "constant",
            DeclKind::Variable => "variable",
            DeclKind::Signal => "signal",
            DeclKind::Enum => "enum",
            DeclKind::EnumValue => "enum_value",
            DeclKind::Export => "export",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorator {
    pub name: String,
    pub args: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    pub file: String,
    pub line: usize,
    pub private: bool,
    pub is_static: bool,
    pub type_hint: Option<String>,
    pub has_default: bool,
    /// Raw value text for constants and variables.
    pub value: Option<String>,
    pub decorators: Vec<Decorator>,
    pub indent: usize,
    /// Enclosing function for locals.
    pub function: Option<String>,
    /// Declared base for inner classes.
    pub base: Option<String>,
}

impl Declaration {
    fn new(kind: DeclKind, name: &str, file: &str, line: usize, indent: usize) -> Self {
        Self {
            kind,
            name: name.to_string(),
            file: file.to_string(),
            line,
            private: name.starts_with('_'),
            is_static: false,
            type_hint: None,
            has_default: false,
            value: None,
            decorators: Vec::new(),
            indent,
            function: None,
            base: None,
        }
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorators.iter().any(|d| d.name == name)
    }

    /// First decorator whose name starts with `export`.
    pub fn export_decorator(&self) -> Option<&Decorator> {
        self.decorators.iter().find(|d| d.name.starts_with("export"))
    }

    pub fn is_onready(&self) -> bool {
        self.has_decorator("onready")
    }

    /// Class-level (not inside a function).
    pub fn is_member(&self) -> bool {
        self.function.is_none()
    }
}

/// The script's `extends` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendsDecl {
    /// Class name, or the path with quotes removed.
    pub target: String,
    pub line: usize,
    /// True for `extends "res://…"`.
    pub is_path: bool,
}

type Extracted = (Vec<Declaration>, Option<(String, usize)>, Option<ExtendsDecl>);

/// Extract declarations along with the `class_name` and `extends` clauses.
pub fn extract_declarations(file: &str, lines: &[String], functions: &[FunctionDef]) -> Extracted {
    let mut decls = Vec::new();
    let mut class_name = None;
    let mut extends = None;
    let mut pending: Vec<Decorator> = Vec::new();

    for f in functions {
        let mut d = Declaration::new(DeclKind::Function, &f.name, file, f.line, f.indent);
        d.is_static = f.is_static;
        d.type_hint = f.return_type.clone();
        decls.push(d);
    }

    let mut idx = 0;
    while idx < lines.len() {
        let line_no = idx + 1;
        let code = code_part(&lines[idx]).trim_end();
        idx += 1;

        if code.trim().is_empty() {
            continue;
        }

        if DECORATOR_ONLY.is_match(code) {
            pending.extend(parse_decorators(code));
            continue;
        }

        let function = enclosing_function(functions, line_no)
            .filter(|f| f.line != line_no)
            .map(|f| f.name.clone());

        if let Some(caps) = CLASS_NAME.captures(code) {
            class_name = Some((caps[1].to_string(), line_no));
            let mut d = Declaration::new(DeclKind::Class, &caps[1], file, line_no, 0);
            if let Some(base) = caps.get(2) {
                let ext = make_extends(base.as_str(), line_no);
                d.base = Some(ext.target.clone());
                extends = Some(ext);
            }
            decls.push(d);
            pending.clear();
            continue;
        }

        if let Some(caps) = EXTENDS.captures(code) {
            let ext = make_extends(&caps[1], line_no);
            if let Some(class_decl) = decls.iter_mut().find(|d| d.kind == DeclKind::Class) {
                class_decl.base = Some(ext.target.clone());
            }
            extends = Some(ext);
            pending.clear();
            continue;
        }

        if let Some(caps) = INNER_CLASS.captures(code) {
            let mut d = Declaration::new(
                DeclKind::InnerClass,
                &caps[2],
                file,
                line_no,
                indent_width(&caps[1]),
            );
            d.base = caps.get(3).map(|m| m.as_str().trim_matches('"').to_string());
            decls.push(d);
            pending.clear();
            continue;
        }

        if let Some(caps) = CONSTANT.captures(code) {
            let mut d = Declaration::new(
                DeclKind::Constant,
                &caps[2],
                file,
                line_no,
                indent_width(&caps[1]),
            );
            d.type_hint = caps.get(3).map(|m| m.as_str().to_string());
            let value = caps[4].trim().to_string();
            d.has_default = !value.is_empty();
            d.value = Some(value);
            d.is_static = true;
            d.function = function;
            decls.push(d);
            pending.clear();
            continue;
        }

        if let Some(caps) = VARIABLE.captures(code) {
            let mut decorators = std::mem::take(&mut pending);
            decorators.extend(parse_decorators(&caps[2]));
            let kind = if decorators.iter().any(|d| d.name.starts_with("export")) {
                DeclKind::Export
            } else {
                DeclKind::Variable
            };
            let mut d = Declaration::new(kind, &caps[4], file, line_no, indent_width(&caps[1]));
            d.is_static = caps.get(3).is_some();
            d.type_hint = caps.get(5).map(|m| m.as_str().to_string());
            if let Some(value) = caps.get(6) {
                let value = value.as_str().trim().trim_end_matches(':').trim().to_string();
                d.has_default = !value.is_empty();
                d.value = Some(value);
            }
            d.decorators = decorators;
            d.function = function;
            decls.push(d);
            continue;
        }

        if let Some(caps) = SIGNAL.captures(code) {
            let mut d =
                Declaration::new(DeclKind::Signal, &caps[2], file, line_no, indent_width(&caps[1]));
            d.function = function;
            decls.push(d);
            pending.clear();
            continue;
        }

        if let Some(caps) = ENUM.captures(code) {
            let indent = indent_width(&caps[1]);
            if let Some(name) = caps.get(2) {
                decls.push(Declaration::new(DeclKind::Enum, name.as_str(), file, line_no, indent));
            }
            // Gather the body up to the closing brace.
            let mut body: Vec<(usize, String)> = vec![(line_no, caps[3].to_string())];
            if !caps[3].contains('}') {
                while idx < lines.len() {
                    let text = code_part(&lines[idx]).to_string();
                    body.push((idx + 1, text.clone()));
                    idx += 1;
                    if text.contains('}') {
                        break;
                    }
                }
            }
            for (value_line, text) in body {
                let text = text.split('}').next().unwrap_or("");
                for item in text.split(',') {
                    let name = item.split('=').next().unwrap_or("").trim();
                    if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                        decls.push(Declaration::new(
                            DeclKind::EnumValue,
                            name,
                            file,
                            value_line,
                            indent,
                        ));
                    }
                }
            }
            pending.clear();
            continue;
        }

        pending.clear();
    }

    decls.sort_by_key(|d| d.line);
    (decls, class_name, extends)
}

fn make_extends(raw: &str, line: usize) -> ExtendsDecl {
    let is_path = raw.starts_with('"') || raw.starts_with('\'');
    ExtendsDecl {
        target: raw.trim_matches(|c| c == '"' || c == '\'').to_string(),
        line,
        is_path,
    }
}

fn parse_decorators(text: &str) -> Vec<Decorator> {
    DECORATOR
        .captures_iter(text)
        .map(|c| Decorator {
            name: c[1].to_string(),
            args: c.get(2).map(|m| m.as_str().trim().to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::extract_functions;

    fn extract(src: &str) -> Extracted {
        let lines: Vec<String> = src.lines().map(str::to_string).collect();
        let funcs = extract_functions(&lines);
        extract_declarations("game/unit.gd", &lines, &funcs)
    }

    #[test]
    fn test_class_name_and_extends() {
        let (_, class_name, extends) = extract("class_name Unit\nextends \"res://game/base.gd\"\n");
        assert_eq!(class_name, Some(("Unit".to_string(), 1)));
        let ext = extends.unwrap();
        assert_eq!(ext.target, "res://game/base.gd");
        assert!(ext.is_path);
    }

    #[test]
    fn test_class_name_with_inline_extends() {
        let (decls, _, extends) = extract("class_name Unit extends Node2D\n");
        assert_eq!(extends.unwrap().target, "Node2D");
        assert_eq!(decls[0].base.as_deref(), Some("Node2D"));
    }

    #[test]
    fn test_variables_and_decorators() {
        let src = "@export_range(0, 10)\nvar speed: float = 2.0\n@onready var label := $Label\nvar _hidden\n";
        let (decls, _, _) = extract(src);
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].kind, DeclKind::Export);
        assert_eq!(decls[0].type_hint.as_deref(), Some("float"));
        assert_eq!(
            decls[0].export_decorator().unwrap().args.as_deref(),
            Some("0, 10")
        );
        assert_eq!(decls[1].kind, DeclKind::Variable);
        assert!(decls[1].is_onready());
        assert_eq!(decls[1].value.as_deref(), Some("$Label"));
        assert!(decls[2].private);
        assert!(!decls[2].has_default);
    }

    #[test]
    fn test_constants_signals_and_locals() {
        let src = "const MAX_HP: int = 10\nsignal died\nfunc f():\n\tvar local = 1\n";
        let (decls, _, _) = extract(src);
        let c = decls.iter().find(|d| d.kind == DeclKind::Constant).unwrap();
        assert_eq!(c.name, "MAX_HP");
        assert_eq!(c.value.as_deref(), Some("10"));
        assert!(decls.iter().any(|d| d.kind == DeclKind::Signal && d.name == "died"));
        let local = decls.iter().find(|d| d.name == "local").unwrap();
        assert_eq!(local.function.as_deref(), Some("f"));
    }

    #[test]
    fn test_multiline_enum() {
        let src = "enum State {\n\tIDLE,\n\tRUNNING = 2,\n}\nenum { A, B }\n";
        let (decls, _, _) = extract(src);
        let values: Vec<&str> = decls
            .iter()
            .filter(|d| d.kind == DeclKind::EnumValue)
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(values, vec!["IDLE", "RUNNING", "A", "B"]);
        assert_eq!(decls.iter().filter(|d| d.kind == DeclKind::Enum).count(), 1);
    }

    #[test]
    fn test_inner_class() {
        let (decls, _, _) = extract("class Wave extends RefCounted:\n\tvar count = 0\n");
        assert_eq!(decls[0].kind, DeclKind::InnerClass);
        assert_eq!(decls[0].base.as_deref(), Some("RefCounted"));
    }
}
