//! Duplicated code: function bodies compared after normalising
//! identifiers, strings and numbers, and contiguous top-level blocks
//! (member tables, constant blocks) compared on their trimmed code.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use phf::phf_set;
use regex::{Captures, Regex};
use serde_json::json;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::lex::code_part;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(
        r#"(?P<s>"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')|(?P<n>\b0x[0-9A-Fa-f_]+\b|\b\d[\d_]*(?:\.\d+)?(?:e[+-]?\d+)?\b)|(?P<i>[A-Za-z_][A-Za-z0-9_]*)"#
    )
    .unwrap();
}

static KEYWORDS: phf::Set<&'static str> = phf_set! {
    "if", "elif", "else", "for", "while", "match", "return", "pass", "break",
    "continue", "func", "var", "const", "in", "and", "or", "not", "is", "as",
    "self", "true", "false", "null", "await", "static", "super", "when",
};

/// One normalised line: identifiers become `VAR`, strings `"STR"`,
/// numbers `NUM`. Keywords are kept.
pub fn normalize_line(line: &str) -> String {
    let code = code_part(line).trim();
    TOKEN
        .replace_all(code, |caps: &Captures<'_>| {
            if caps.name("s").is_some() {
                "\"STR\"".to_string()
            } else if caps.name("n").is_some() {
                "NUM".to_string()
            } else {
                let word = &caps[0];
                if KEYWORDS.contains(word) {
                    word.to_string()
                } else {
                    "VAR".to_string()
                }
            }
        })
        .into_owned()
}

/// Fingerprint of a normalised block, stable across builds.
pub fn fingerprint(normalized: &str) -> String {
    let mut hex = blake3::hash(normalized.as_bytes()).to_hex().to_string();
    hex.truncate(16);
    hex
}

#[derive(Debug, Clone)]
struct Block {
    file: String,
    /// Function name; `None` for a top-level block.
    function: Option<String>,
    start: usize,
    end: usize,
    lines: usize,
}

impl Block {
    fn label(&self) -> String {
        match &self.function {
            Some(name) => format!("{}()", name),
            None => "top-level block".to_string(),
        }
    }
}

/// Runs of consecutive code lines outside every function, as
/// (first line, last line, trimmed code). Blank and comment-only lines end
/// a run.
fn top_level_runs(lines: &[String], functions: &[crate::lex::FunctionDef]) -> Vec<(usize, usize, Vec<String>)> {
    let in_function = |n: usize| functions.iter().any(|f| f.line <= n && n <= f.end_line);
    let mut runs = Vec::new();
    let mut current: Option<(usize, usize, Vec<String>)> = None;

    for (idx, raw) in lines.iter().enumerate() {
        let n = idx + 1;
        let code = code_part(raw).trim();
        if code.is_empty() || in_function(n) {
            runs.extend(current.take());
            continue;
        }
        match current.as_mut() {
            Some(run) => {
                run.1 = n;
                run.2.push(code.to_string());
            }
            None => current = Some((n, n, vec![code.to_string()])),
        }
    }
    runs.extend(current);
    runs
}

pub struct Duplicates;

impl Check for Duplicates {
    fn id(&self) -> &'static str {
        "duplicates"
    }

    fn name(&self) -> &'static str {
        "Duplicate code"
    }

    fn category(&self) -> Category {
        Category::Maintenance
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.duplicate_groups")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let min_lines = ctx
            .options
            .threshold
            .unwrap_or(ctx.project.config.duplicates.min_lines);
        let mut groups: BTreeMap<String, Vec<Block>> = BTreeMap::new();
        let mut blocks = 0usize;

        for (file, facts) in ctx.project.sources() {
            for f in &facts.functions {
                let body: Vec<String> = f
                    .body_range()
                    .map(|n| normalize_line(file.line(n)))
                    .filter(|l| !l.is_empty())
                    .collect();
                if body.len() < min_lines {
                    continue;
                }
                blocks += 1;
                groups.entry(format!("func\n{}", body.join("\n"))).or_default().push(Block {
                    file: file.rel_path.clone(),
                    function: Some(f.name.clone()),
                    start: f.line,
                    end: f.end_line,
                    lines: body.len(),
                });
            }

            for (start, end, code) in top_level_runs(&file.lines, &facts.functions) {
                if code.len() < min_lines {
                    continue;
                }
                blocks += 1;
                groups.entry(format!("top\n{}", code.join("\n"))).or_default().push(Block {
                    file: file.rel_path.clone(),
                    function: None,
                    start,
                    end,
                    lines: code.len(),
                });
            }
        }

        let mut reported = Vec::new();
        let mut duplicated_lines = 0usize;
        for (normalized, group) in groups.into_iter().filter(|(_, g)| g.len() >= 2) {
            let hash = fingerprint(&normalized);
            let first = &group[0];
            for dup in &group[1..] {
                duplicated_lines += dup.lines;
                out.push(
                    Issue::new(
                        self.id(),
                        &dup.file,
                        dup.start,
                        "duplicate_block",
                        format!(
                            "{} ({} lines) duplicates {} at {}:{}",
                            dup.label(),
                            dup.lines,
                            first.label(),
                            first.file,
                            first.start
                        ),
                        Severity::Warning,
                    )
                    .with_suggestion(if dup.function.is_some() {
                        "extract the shared body into one function"
                    } else {
                        "move the shared table into one script or resource"
                    }),
                );
            }
            let locations: Vec<_> = group
                .iter()
                .map(|b| json!({"file": b.file, "function": b.function, "start": b.start, "end": b.end}))
                .collect();
            reported.push(json!({"hash": hash, "lines": first.lines, "locations": locations}));
        }

        // Order groups by their first location.
        reported.sort_by(|a, b| {
            let key = |v: &serde_json::Value| {
                (
                    v["locations"][0]["file"].as_str().unwrap_or_default().to_string(),
                    v["locations"][0]["start"].as_u64().unwrap_or_default(),
                )
            };
            key(a).cmp(&key(b))
        });

        out.set("min_lines", min_lines);
        out.set("blocks", blocks);
        out.set("duplicate_groups", reported.len());
        out.set("duplicated_lines", duplicated_lines);
        out.set("groups", reported);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize_line("\tif enemy.hp > 10 and name == \"boss\": # hi"),
            "if VAR.VAR > NUM and VAR == \"STR\":"
        );
        assert_eq!(normalize_line("return self.x2 + 0.5"), "return self.VAR + NUM");
        assert_eq!(normalize_line("   # only a comment"), "");
    }

    const BODY_A: &str = "func spawn_wave(count):\n\
\tvar spawned = []\n\
\tfor i in range(count):\n\
\t\tvar e = Enemy.new()\n\
\t\te.hp = 10\n\
\t\tspawned.append(e)\n\
\tprint(\"spawned\")\n\
\treturn spawned\n";

    const BODY_B: &str = "func make_towers(n):\n\
\tvar towers = []\n\
\tfor j in range(n):\n\
\t\tvar t = Tower.new()\n\
\t\tt.cost = 25\n\
\t\ttowers.append(t)\n\
\tprint(\"built\")\n\
\treturn towers\n";

    #[test]
    fn test_renamed_copy_is_found() {
        let out = testutil::run(&Duplicates, &[("a.gd", BODY_A), ("b.gd", BODY_B)]);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].file, "b.gd");
        assert!(out.issues[0].message.contains("spawn_wave() at a.gd:1"));
        assert_eq!(out.summary["duplicate_groups"], 1);
        assert_eq!(out.summary["groups"][0]["locations"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_short_bodies_ignored() {
        let src = "func a():\n\treturn 1\nfunc b():\n\treturn 2\n";
        let out = testutil::run(&Duplicates, &[("a.gd", src)]);
        assert!(out.issues.is_empty());
        assert_eq!(out.summary["blocks"], 0);
    }

    #[test]
    fn test_stable_fingerprint() {
        assert_eq!(fingerprint("x"), fingerprint("x"));
        assert_ne!(fingerprint("x"), fingerprint("y"));
        assert_eq!(fingerprint("x").len(), 16);
        assert_eq!(fingerprint(""), "af1349b9f5f9a1a6");
    }

    const TABLE: &str = "const TOWER_COSTS = {\n\
\t\"arrow\": 25,\n\
\t\"cannon\": 60,\n\
\t\"frost\": 45,\n\
\t\"tesla\": 90,\n\
\t\"mortar\": 75,\n\
}\n";

    #[test]
    fn test_shared_top_level_block() {
        let shop = format!("extends Control\n\n{}\nfunc _ready():\n\tpass\n", TABLE);
        let build = format!("extends Node\n# prices\n{}", TABLE);
        let out = testutil::run(&Duplicates, &[("ui/shop.gd", &shop), ("game/build.gd", &build)]);
        assert_eq!(out.issues.len(), 1);
        let issue = &out.issues[0];
        assert_eq!(issue.file, "ui/shop.gd");
        assert_eq!(issue.line, 3);
        assert_eq!(issue.message, "top-level block (7 lines) duplicates top-level block at game/build.gd:3");
        assert_eq!(out.summary["groups"][0]["locations"][0]["function"], serde_json::Value::Null);
    }

    #[test]
    fn test_top_level_blocks_are_not_renamed() {
        let a = "var hp: int = 0\nvar mp: int = 0\nvar gold: int = 0\nvar xp: int = 0\nvar level: int = 0\nvar speed: int = 0\n";
        let b = "var lives: int = 0\nvar score: int = 0\nvar wave: int = 0\nvar day: int = 0\nvar ammo: int = 0\nvar combo: int = 0\n";
        let out = testutil::run(&Duplicates, &[("a.gd", a), ("b.gd", b)]);
        assert!(out.issues.is_empty());
        assert_eq!(out.summary["blocks"], 2);
    }
}
