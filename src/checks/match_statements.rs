//! `match` blocks: missing default branches, duplicate patterns and
//! oversized matches.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Rating, Threshold};
use crate::lex::MatchBlock;

/// Matches with more cases than this are reported.
pub const MAX_CASES: usize = 10;

lazy_static! {
    static ref ENUM_LIKE: Regex = Regex::new(
        r#"^(?:(?:[A-Z][A-Za-z0-9_]*\.)*[A-Z][A-Z0-9_]*|"[^"]*"|'[^']*'|-?\d+)$"#
    )
    .unwrap();
}

/// UPPERCASE constant (optionally qualified), string literal or integer.
pub fn is_enum_like(pattern: &str) -> bool {
    ENUM_LIKE.is_match(pattern)
}

pub struct MatchStatements;

impl MatchStatements {
    fn inspect(&self, rel: &str, block: &MatchBlock) -> Vec<Issue> {
        let mut issues = Vec::new();
        let patterns: Vec<(&str, usize)> = block.patterns().collect();

        if !block.has_default
            && !patterns.is_empty()
            && patterns.iter().all(|(p, _)| is_enum_like(p))
        {
            issues.push(
                Issue::rated(
                    self.id(),
                    rel,
                    block.line,
                    "missing_default",
                    format!("match on '{}' has no `_` branch", block.subject),
                    Rating::Medium,
                )
                .with_suggestion("add `_:` to handle unexpected values"),
            );
        }

        if block.cases.len() > MAX_CASES {
            issues.push(
                Issue::rated(
                    self.id(),
                    rel,
                    block.line,
                    "large_match",
                    format!("match on '{}' has {} cases", block.subject, block.cases.len()),
                    Rating::Low,
                )
                .with_suggestion("consider a lookup table or polymorphism"),
            );
        }

        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for (pattern, line) in patterns {
            match seen.get(pattern) {
                Some(first) => issues.push(Issue::rated(
                    self.id(),
                    rel,
                    line,
                    "duplicate_pattern",
                    format!("pattern {} already matched on line {}", pattern, first),
                    Rating::High,
                )),
                None => {
                    seen.insert(pattern, line);
                }
            }
        }
        issues
    }
}

impl Check for MatchStatements {
    fn id(&self) -> &'static str {
        "match_statements"
    }

    fn name(&self) -> &'static str {
        "Match statements"
    }

    fn category(&self) -> Category {
        Category::Structure
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.by_rating.high")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let mut blocks = 0usize;
        let mut cases = 0usize;
        let mut with_default = 0usize;

        for (file, facts) in ctx.project.sources() {
            for block in &facts.matches {
                blocks += 1;
                cases += block.cases.len();
                if block.has_default {
                    with_default += 1;
                }
                out.extend(self.inspect(&file.rel_path, block));
            }
        }

        out.set("matches", blocks);
        out.set("cases", cases);
        out.set("with_default", with_default);
        out.set("by_rating", serde_json::to_value(super::rating_counts(&out.issues))?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{testutil, Severity};

    #[test]
    fn test_enum_like() {
        assert!(is_enum_like("IDLE"));
        assert!(is_enum_like("State.RUNNING"));
        assert!(is_enum_like("\"walk\""));
        assert!(is_enum_like("-1"));
        assert!(!is_enum_like("var x"));
        assert!(!is_enum_like("[1, 2]"));
        assert!(!is_enum_like("Idle"));
    }

    #[test]
    fn test_missing_default_and_duplicate() {
        let src = "func f(s):\n\
\tmatch s:\n\
\t\tState.IDLE:\n\
\t\t\tpass\n\
\t\tState.RUN, State.IDLE:\n\
\t\t\tpass\n";
        let out = testutil::run(&MatchStatements, &[("a.gd", src)]);
        assert_eq!(testutil::types(&out), vec!["missing_default", "duplicate_pattern"]);
        assert_eq!(out.issues[0].rating, Some(Rating::Medium));
        assert_eq!(out.issues[1].line, 5);
        assert_eq!(out.issues[1].rating, Some(Rating::High));
        assert_eq!(out.issues[1].severity, Severity::Warning);
        assert_eq!(out.summary["by_rating"]["high"], 1);
    }

    #[test]
    fn test_lone_default_counts() {
        let out = testutil::run(&MatchStatements, &[("a.gd", "func f(s):\n\tmatch s:\n\t\t_:\n\t\t\tpass\n")]);
        assert!(out.issues.is_empty());
        assert_eq!(out.summary["with_default"], 1);
    }

    #[test]
    fn test_structural_patterns_skip_default_rule() {
        let src = "func f(v):\n\tmatch v:\n\t\t[1, 2]:\n\t\t\tpass\n\t\t{\"k\": 1}:\n\t\t\tpass\n";
        let out = testutil::run(&MatchStatements, &[("a.gd", src)]);
        assert!(out.issues.is_empty());
    }

    #[test]
    fn test_large_match() {
        let mut src = String::from("func f(n):\n\tmatch n:\n");
        for i in 0..11 {
            src.push_str(&format!("\t\t{}:\n\t\t\tpass\n", i));
        }
        src.push_str("\t\t_:\n\t\t\tpass\n");
        let out = testutil::run(&MatchStatements, &[("a.gd", &src)]);
        assert_eq!(testutil::types(&out), vec!["large_match"]);
        assert_eq!(out.issues[0].severity, Severity::Info);
    }
}
