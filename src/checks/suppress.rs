//! Inline suppression of issues via comments.
//!
//! A directive names an issue type, a check id or `*`:
//! `# gdscan:ignore print_statement - reason` covers its own line (or the
//! next one when it stands alone), `ignore-next-line` always covers the
//! next line and `ignore-file` covers the whole script when it sits in the
//! leading comment block.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::Issue;
use crate::project::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Line,
    NextLine,
    File,
}

/// One `gdscan:ignore*` comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suppression {
    pub file: String,
    /// Line of the comment; 0 for file scope.
    pub line: usize,
    pub scope: Scope,
    /// Issue type, check id or `*`.
    pub target: String,
    pub reason: String,
}

impl Suppression {
    fn names(&self, issue: &Issue) -> bool {
        self.target == "*" || self.target == issue.issue_type || self.target == issue.check
    }

    /// Whether this directive silences `issue`.
    pub fn covers(&self, issue: &Issue) -> bool {
        if issue.file != self.file || !self.names(issue) {
            return false;
        }
        match self.scope {
            Scope::File => true,
            Scope::Line => issue.line == self.line,
            Scope::NextLine => issue.line == self.line + 1,
        }
    }
}

lazy_static! {
    static ref DIRECTIVE: Regex =
        Regex::new(r"#\s*gdscan:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*))?").unwrap();
}

/// Lines a file-level directive may appear on when it is not in the
/// leading comment block.
const FILE_HEADER_LINES: usize = 10;

/// Directives found in a script, in line order.
pub fn parse_suppressions(file: &str, lines: &[String]) -> Vec<Suppression> {
    let mut found = Vec::new();
    let mut in_header = true;

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if in_header && !trimmed.is_empty() && !trimmed.starts_with('#') {
            in_header = false;
        }
        let Some(caps) = DIRECTIVE.captures(line) else { continue };
        let Some(whole) = caps.get(0) else { continue };

        let scope = match &caps[1] {
            "ignore-file" if in_header || line_no <= FILE_HEADER_LINES => Scope::File,
            "ignore-file" => continue,
            "ignore-next-line" => Scope::NextLine,
            _ if line[..whole.start()].trim().is_empty() => Scope::NextLine,
            _ => Scope::Line,
        };
        found.push(Suppression {
            file: file.to_string(),
            line: if scope == Scope::File { 0 } else { line_no },
            scope,
            target: caps[2].to_string(),
            reason: caps.get(3).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
        });
    }
    found
}

/// Suppressions of every script, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct SuppressionIndex {
    by_file: BTreeMap<String, Vec<Suppression>>,
}

impl SuppressionIndex {
    pub fn collect(scripts: &[SourceFile]) -> Self {
        let by_file = scripts
            .iter()
            .map(|s| (s.rel_path.clone(), parse_suppressions(&s.rel_path, &s.lines)))
            .filter(|(_, list)| !list.is_empty())
            .collect();
        Self { by_file }
    }

    pub fn len(&self) -> usize {
        self.by_file.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }

    /// Split issues into (kept, suppressed).
    pub fn filter(&self, issues: Vec<Issue>) -> (Vec<Issue>, Vec<Issue>) {
        issues.into_iter().partition(|issue| {
            !self
                .by_file
                .get(&issue.file)
                .is_some_and(|list| list.iter().any(|s| s.covers(issue)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::Severity;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    #[test]
    fn test_file_and_trailing_directives() {
        let content = "# gdscan:ignore-file magic_number - tuning table\nextends Node\n\nfunc f():\n\tprint(1) # gdscan:ignore print_statement - debug\n";
        let found = parse_suppressions("a.gd", &lines(content));
        let got: Vec<(Scope, usize, &str)> = found.iter().map(|s| (s.scope, s.line, s.target.as_str())).collect();
        assert_eq!(got, vec![(Scope::File, 0, "magic_number"), (Scope::Line, 5, "print_statement")]);
        assert_eq!(found[0].reason, "tuning table");
    }

    #[test]
    fn test_standalone_ignore_covers_next_line() {
        let content = "extends Node\n# gdscan:ignore *\nvar x = data[\"hp\"]\n";
        let found = parse_suppressions("a.gd", &lines(content));
        assert_eq!(found[0].scope, Scope::NextLine);
        assert_eq!(found[0].line, 2);
    }

    #[test]
    fn test_late_file_directive_is_ignored() {
        let mut text = String::from("extends Node\n");
        for _ in 0..12 {
            text.push_str("var a = 1\n");
        }
        text.push_str("# gdscan:ignore-file *\n");
        assert!(parse_suppressions("a.gd", &lines(&text)).is_empty());
    }

    #[test]
    fn test_covers_by_type_check_or_wildcard() {
        let issue = Issue::new("print_statements", "a.gd", 5, "print_statement", "print()", Severity::Info);
        let at = |target: &str, scope| Suppression {
            file: "a.gd".to_string(),
            line: 4,
            scope,
            target: target.to_string(),
            reason: String::new(),
        };
        assert!(at("print_statement", Scope::NextLine).covers(&issue));
        assert!(at("print_statements", Scope::File).covers(&issue));
        assert!(at("*", Scope::NextLine).covers(&issue));
        assert!(!at("magic_number", Scope::File).covers(&issue));
        assert!(!at("*", Scope::Line).covers(&issue));
    }
}
