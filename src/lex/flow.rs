//! `await` sites and `match` blocks.
//!
//! Case labels are the lines at the first indentation level below the
//! `match` header; the block ends at the first code line indented at or
//! above the header. Patterns spanning several lines are truncated to the
//! first line.

use lazy_static::lazy_static;
use regex::Regex;

use super::functions::{enclosing_function, FunctionDef};
use super::{code_part, indent_width, is_inside_string_literal};

lazy_static! {
    static ref AWAIT: Regex = Regex::new(r"\bawait\s+(.+)").unwrap();
    static ref MATCH_HEADER: Regex = Regex::new(r"^(\s*)match\s+(.+?)\s*:\s*$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwaitSite {
    pub expr: String,
    pub line: usize,
    pub function: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCase {
    /// Comma-separated alternatives of one branch.
    pub patterns: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchBlock {
    pub subject: String,
    pub line: usize,
    pub cases: Vec<MatchCase>,
    /// Has a `_` or bare `var` binding branch.
    pub has_default: bool,
    pub function: Option<String>,
}

impl MatchBlock {
    pub fn patterns(&self) -> impl Iterator<Item = (&str, usize)> {
        self.cases
            .iter()
            .flat_map(|c| c.patterns.iter().map(move |p| (p.as_str(), c.line)))
    }
}

pub fn extract_awaits(lines: &[String], functions: &[FunctionDef]) -> Vec<AwaitSite> {
    let mut sites = Vec::new();
    for (idx, raw) in lines.iter().enumerate() {
        let code = code_part(raw);
        let Some(caps) = AWAIT.captures(code) else {
            continue;
        };
        let Some(m) = caps.get(0) else { continue };
        if is_inside_string_literal(code, m.start()) {
            continue;
        }
        let line_no = idx + 1;
        sites.push(AwaitSite {
            expr: caps[1].trim().to_string(),
            line: line_no,
            function: enclosing_function(functions, line_no).map(|f| f.name.clone()),
        });
    }
    sites
}

pub fn extract_matches(lines: &[String], functions: &[FunctionDef]) -> Vec<MatchBlock> {
    let mut blocks = Vec::new();

    for (idx, raw) in lines.iter().enumerate() {
        let code = code_part(raw);
        let Some(caps) = MATCH_HEADER.captures(code) else {
            continue;
        };
        let header_indent = indent_width(&caps[1]);
        let line_no = idx + 1;
        let mut case_indent: Option<usize> = None;
        let mut cases = Vec::new();

        for (offset, body_raw) in lines[idx + 1..].iter().enumerate() {
            let body = code_part(body_raw);
            if body.trim().is_empty() {
                continue;
            }
            let indent = indent_width(body);
            if indent <= header_indent {
                break;
            }
            let level = *case_indent.get_or_insert(indent);
            if indent != level {
                continue;
            }
            if let Some(label) = case_label(body.trim()) {
                cases.push(MatchCase {
                    patterns: split_patterns(label),
                    line: line_no + offset + 1,
                });
            }
        }

        let has_default = cases
            .iter()
            .flat_map(|c| c.patterns.iter())
            .any(|p| p == "_" || p.starts_with("var "));

        blocks.push(MatchBlock {
            subject: caps[2].to_string(),
            line: line_no,
            cases,
            has_default,
            function: enclosing_function(functions, line_no).map(|f| f.name.clone()),
        });
    }

    blocks
}

/// Text of a branch label before its top-level `:`.
fn case_label(line: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for (i, ch) in line.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '[' | '{' | '(' => depth += 1,
                ']' | '}' | ')' => depth -= 1,
                ':' if depth == 0 => return Some(line[..i].trim()),
                _ => {}
            },
        }
    }
    None
}

fn split_patterns(label: &str) -> Vec<String> {
    let label = label.split(" when ").next().unwrap_or(label);
    let mut patterns = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut current = String::new();
    for ch in label.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                current.push(ch);
            }
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '[' | '{' | '(' => {
                    depth += 1;
                    current.push(ch);
                }
                ']' | '}' | ')' => {
                    depth -= 1;
                    current.push(ch);
                }
                ',' if depth == 0 => {
                    patterns.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(ch),
            },
        }
    }
    if !current.trim().is_empty() {
        patterns.push(current.trim().to_string());
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::extract_functions;

    fn lines(src: &str) -> Vec<String> {
        src.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_await_attribution() {
        let src = lines("func _process(delta):\n\tawait get_tree().create_timer(0.1).timeout\n");
        let funcs = extract_functions(&src);
        let sites = extract_awaits(&src, &funcs);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].function.as_deref(), Some("_process"));
        assert_eq!(sites[0].expr, "get_tree().create_timer(0.1).timeout");
    }

    #[test]
    fn test_match_cases_and_default() {
        let src = lines(
            "func f(s):\n\tmatch s:\n\t\tIDLE, WAIT:\n\t\t\tpass\n\t\t\"run\": go()\n\t\t_:\n\t\t\tpass\n\tdone()\n",
        );
        let funcs = extract_functions(&src);
        let blocks = extract_matches(&src, &funcs);
        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!(b.subject, "s");
        assert_eq!(b.cases.len(), 3);
        assert_eq!(b.cases[0].patterns, vec!["IDLE", "WAIT"]);
        assert_eq!(b.cases[1].patterns, vec!["\"run\""]);
        assert!(b.has_default);
        assert_eq!(b.function.as_deref(), Some("f"));
    }

    #[test]
    fn test_only_default_case() {
        let src = lines("match x:\n\t_:\n\t\tpass\n");
        let blocks = extract_matches(&src, &[]);
        assert!(blocks[0].has_default);
        assert_eq!(blocks[0].cases.len(), 1);
    }

    #[test]
    fn test_dictionary_pattern_is_one_case() {
        let src = lines("match d:\n\t{\"a\": 1, \"b\": 2}:\n\t\tpass\n");
        let blocks = extract_matches(&src, &[]);
        assert_eq!(blocks[0].cases[0].patterns.len(), 1);
        assert!(!blocks[0].has_default);
    }
}
