//! Function definitions and indent-based body scoping.
//!
//! A body runs from the line after the `func` header to the last code line
//! indented deeper than the header. Blank and comment-only lines never end
//! a body, so trailing comments at column 0 between functions are not
//! counted. Parameter lists split across lines are captured only up to the
//! first line break.

use lazy_static::lazy_static;
use regex::Regex;

use super::{code_part, indent_width, is_blank_or_comment};

lazy_static! {
    static ref FUNC_HEADER: Regex = Regex::new(
        r"^(\s*)(static\s+)?func\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)?(?:\s*->\s*([A-Za-z_][A-Za-z0-9_\[\].]*))?"
    )
    .unwrap();
    static ref BLOCK_OPENER: Regex =
        Regex::new(r"^(if|elif|else|for|while|match)\b.*:$").unwrap();
}

/// One `func` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    /// 1-based header line.
    pub line: usize,
    /// Last line of the body; equal to `line` for single-line functions.
    pub end_line: usize,
    pub indent: usize,
    pub is_static: bool,
    /// Parameter names without type hints or defaults.
    pub params: Vec<String>,
    pub return_type: Option<String>,
    /// Lines from the line after the header through `end_line`.
    pub body_lines: usize,
    /// Body lines that are neither blank, comment-only nor purely structural.
    pub statements: usize,
    /// Deepest control-flow block nesting inside the body.
    pub max_nesting: usize,
    /// Preceded by a `##` doc comment.
    pub has_doc_comment: bool,
}

impl FunctionDef {
    pub fn is_private(&self) -> bool {
        self.name.starts_with('_')
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.line && line <= self.end_line
    }

    /// 1-based line numbers of the body.
    pub fn body_range(&self) -> std::ops::RangeInclusive<usize> {
        (self.line + 1)..=self.end_line
    }
}

/// Extract every named function in source order.
pub fn extract_functions(lines: &[String]) -> Vec<FunctionDef> {
    let mut functions = Vec::new();

    for (idx, raw) in lines.iter().enumerate() {
        let code = code_part(raw);
        let Some(caps) = FUNC_HEADER.captures(code) else {
            continue;
        };

        let indent = indent_width(&caps[1]);
        let name = caps[3].to_string();
        let params = parse_params(caps.get(4).map(|m| m.as_str()).unwrap_or(""));
        let return_type = caps.get(5).map(|m| m.as_str().to_string());

        let end_idx = body_end(lines, idx, indent);
        let header_line = idx + 1;
        let end_line = end_idx + 1;

        let body = &lines[(idx + 1).min(lines.len())..(end_idx + 1).max(idx + 1)];
        let statements = body.iter().filter(|l| is_statement(l)).count();
        let max_nesting = nesting_depth(body);

        functions.push(FunctionDef {
            name,
            line: header_line,
            end_line,
            indent,
            is_static: caps.get(2).is_some(),
            params,
            return_type,
            body_lines: end_line - header_line,
            statements,
            max_nesting,
            has_doc_comment: has_doc_comment(lines, idx),
        });
    }

    functions
}

/// Innermost function containing a 1-based line, header included.
pub fn enclosing_function(functions: &[FunctionDef], line: usize) -> Option<&FunctionDef> {
    functions
        .iter()
        .filter(|f| f.contains(line))
        .max_by_key(|f| f.line)
}

/// Index of the last body line for a header at `header_idx`.
fn body_end(lines: &[String], header_idx: usize, header_indent: usize) -> usize {
    let mut end = header_idx;
    for (offset, line) in lines[header_idx + 1..].iter().enumerate() {
        if is_blank_or_comment(line) {
            continue;
        }
        if indent_width(line) <= header_indent {
            break;
        }
        end = header_idx + 1 + offset;
    }
    end
}

fn parse_params(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|p| {
            let name = p
                .split(|c| c == ':' || c == '=')
                .next()
                .unwrap_or("")
                .trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

fn is_statement(line: &str) -> bool {
    let code = code_part(line).trim();
    if code.is_empty() {
        return false;
    }
    if code == "pass" || code == "else:" {
        return false;
    }
    !code.chars().all(|c| matches!(c, ')' | ']' | '}' | ',' | ' '))
}

fn nesting_depth(body: &[String]) -> usize {
    let mut stack: Vec<usize> = Vec::new();
    let mut max = 0;
    for line in body {
        let code = code_part(line).trim_end();
        if code.trim().is_empty() {
            continue;
        }
        let indent = indent_width(line);
        while stack.last().is_some_and(|&top| top >= indent) {
            stack.pop();
        }
        max = max.max(stack.len());
        if BLOCK_OPENER.is_match(code.trim_start()) {
            stack.push(indent);
        }
    }
    max
}

fn has_doc_comment(lines: &[String], header_idx: usize) -> bool {
    let mut idx = header_idx;
    while idx > 0 {
        idx -= 1;
        let trimmed = lines[idx].trim();
        if trimmed.starts_with('@') {
            continue;
        }
        return trimmed.starts_with("##");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<String> {
        src.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_extract_basic_function() {
        let src = lines("extends Node\n\nstatic func add(a: int, b := 2) -> int:\n\treturn a + b\n");
        let funcs = extract_functions(&src);
        assert_eq!(funcs.len(), 1);
        let f = &funcs[0];
        assert_eq!(f.name, "add");
        assert_eq!(f.line, 3);
        assert_eq!(f.end_line, 4);
        assert!(f.is_static);
        assert_eq!(f.params, vec!["a", "b"]);
        assert_eq!(f.return_type.as_deref(), Some("int"));
        assert_eq!(f.body_lines, 1);
    }

    #[test]
    fn test_body_ends_on_dedent_and_skips_trailing_blanks() {
        let src = lines("func a():\n\tvar x = 1\n\n\t# note\n\tx += 1\n\n\nfunc b():\n\tpass\n");
        let funcs = extract_functions(&src);
        assert_eq!(funcs[0].end_line, 5);
        assert_eq!(funcs[0].body_lines, 4);
        assert_eq!(funcs[0].statements, 2);
        assert_eq!(funcs[1].line, 8);
        assert_eq!(funcs[1].statements, 0);
    }

    #[test]
    fn test_mixed_tabs_and_spaces() {
        let src = lines("func a():\n\tvar x = 1\n    x += 1\nvar y = 2\n");
        let funcs = extract_functions(&src);
        assert_eq!(funcs[0].end_line, 3);
    }

    #[test]
    fn test_nesting_depth() {
        let src = lines(
            "func a():\n\tif x:\n\t\tfor i in 3:\n\t\t\tif y:\n\t\t\t\tprint(i)\n\telse:\n\t\tpass\n",
        );
        let funcs = extract_functions(&src);
        assert_eq!(funcs[0].max_nesting, 3);
    }

    #[test]
    fn test_enclosing_function_prefers_innermost() {
        let src = lines("class Inner:\n\tfunc a():\n\t\tpass\nfunc _process(delta):\n\tawait x\n");
        let funcs = extract_functions(&src);
        assert_eq!(enclosing_function(&funcs, 3).unwrap().name, "a");
        assert_eq!(enclosing_function(&funcs, 5).unwrap().name, "_process");
        assert_eq!(enclosing_function(&funcs, 4).unwrap().name, "_process");
        assert!(enclosing_function(&funcs, 1).is_none());
    }

    #[test]
    fn test_doc_comment_detection() {
        let src = lines("## Spawns a wave.\n@rpc\nfunc spawn():\n\tpass\n\nfunc other():\n\tpass\n");
        let funcs = extract_functions(&src);
        assert!(funcs[0].has_doc_comment);
        assert!(!funcs[1].has_doc_comment);
    }

    #[test]
    fn test_commented_function_is_ignored() {
        let src = lines("# func old():\nfunc new():\n\tpass\n");
        let funcs = extract_functions(&src);
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].name, "new");
    }
}
