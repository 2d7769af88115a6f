//! `preload`/`load` calls and path-based `extends`.
//!
//! Only literal string arguments are recognised; computed paths such as
//! `load(base + "x.gd")` are skipped.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::declarations::ExtendsDecl;
use super::functions::{enclosing_function, FunctionDef};
use super::{code_part, is_inside_string_literal};

lazy_static! {
    static ref LOAD_CALL: Regex =
        Regex::new(r#"\b(preload|load)\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap();
    static ref BINDING: Regex =
        Regex::new(r"^\s*(?:@[A-Za-z_]+\s+)*(?:static\s+)?(?:const|var)\s+([A-Za-z_][A-Za-z0-9_]*)")
            .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Preload,
    Load,
    Extends,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Preload => "preload",
            ImportKind::Load => "load",
            ImportKind::Extends => "extends",
        }
    }
}

/// Where a load happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportScope {
    Class,
    Onready,
    Function,
}

impl ImportScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportScope::Class => "class",
            ImportScope::Onready => "onready",
            ImportScope::Function => "function",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub kind: ImportKind,
    /// Literal path as written.
    pub target: String,
    pub line: usize,
    pub scope: ImportScope,
    pub function: Option<String>,
    /// Name of the `const`/`var` the result is bound to.
    pub binding: Option<String>,
}

pub fn extract_imports(
    lines: &[String],
    functions: &[FunctionDef],
    extends: Option<&ExtendsDecl>,
) -> Vec<ImportRef> {
    let mut imports = Vec::new();

    if let Some(ext) = extends.filter(|e| e.is_path) {
        imports.push(ImportRef {
            kind: ImportKind::Extends,
            target: ext.target.clone(),
            line: ext.line,
            scope: ImportScope::Class,
            function: None,
            binding: None,
        });
    }

    for (idx, raw) in lines.iter().enumerate() {
        let code = code_part(raw);
        if !code.contains("load") {
            continue;
        }
        let line_no = idx + 1;
        let function = enclosing_function(functions, line_no)
            .filter(|f| f.line != line_no)
            .map(|f| f.name.clone());

        for caps in LOAD_CALL.captures_iter(code) {
            let Some(m) = caps.get(0) else { continue };
            if is_inside_string_literal(code, m.start()) {
                continue;
            }
            let kind = if &caps[1] == "preload" {
                ImportKind::Preload
            } else {
                ImportKind::Load
            };
            let scope = if function.is_some() {
                ImportScope::Function
            } else if code.contains("@onready") {
                ImportScope::Onready
            } else {
                ImportScope::Class
            };
            imports.push(ImportRef {
                kind,
                target: caps[2].to_string(),
                line: line_no,
                scope,
                function: function.clone(),
                binding: BINDING.captures(code).map(|b| b[1].to_string()),
            });
        }
    }

    imports.sort_by_key(|i| i.line);
    imports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::extract_functions;

    fn extract(src: &str, extends: Option<&ExtendsDecl>) -> Vec<ImportRef> {
        let lines: Vec<String> = src.lines().map(str::to_string).collect();
        let funcs = extract_functions(&lines);
        extract_imports(&lines, &funcs, extends)
    }

    #[test]
    fn test_scopes() {
        let src = "const Hud = preload(\"res://ui/hud.gd\")\n@onready var tex = load(\"res://a.png\")\nfunc f():\n\tvar s = preload(\"res://b.tscn\")\n";
        let imports = extract(src, None);
        assert_eq!(imports.len(), 3);
        assert_eq!(imports[0].kind, ImportKind::Preload);
        assert_eq!(imports[0].scope, ImportScope::Class);
        assert_eq!(imports[0].binding.as_deref(), Some("Hud"));
        assert_eq!(imports[1].scope, ImportScope::Onready);
        assert_eq!(imports[1].kind, ImportKind::Load);
        assert_eq!(imports[2].scope, ImportScope::Function);
        assert_eq!(imports[2].function.as_deref(), Some("f"));
    }

    #[test]
    fn test_ignores_comments_and_strings() {
        let src = "# preload(\"res://x.gd\")\nvar s = \"preload('res://y.gd')\"\n";
        assert!(extract(src, None).is_empty());
    }

    #[test]
    fn test_path_extends_is_an_import() {
        let ext = ExtendsDecl {
            target: "res://base.gd".to_string(),
            line: 1,
            is_path: true,
        };
        let imports = extract("extends \"res://base.gd\"\n", Some(&ext));
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].kind, ImportKind::Extends);
    }
}
