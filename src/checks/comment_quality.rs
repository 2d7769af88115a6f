//! Comment hygiene: commented-out code, undocumented long public
//! functions, stray empty comments and the overall comment ratio.

use lazy_static::lazy_static;
use regex::Regex;

use super::naming::LIFECYCLE_HOOKS;
use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::project::SourceFile;

/// Public functions longer than this should carry a `##` doc comment.
pub const DOC_MIN_LINES: usize = 20;

lazy_static! {
    static ref CODE_LIKE: Regex = Regex::new(
        r#"^(?:(?:var|const|func|static func|class_name|@onready|@export)\s+[A-Za-z_]|extends\s+[A-Za-z"]|(?:if|elif|while|match)\s.*:$|for\s+[A-Za-z_][A-Za-z0-9_]*\s+in\s.+:$|else:$|signal\s+[A-Za-z_][A-Za-z0-9_]*(?:\(.*\))?$|await\s+\S+$|[A-Za-z_][A-Za-z0-9_.]*(?:\(.*\)|\s*\[.*\]\s*=.+|\s*[-+*/]?=\s*[^=\s].*)$|\$[A-Za-z])"#
    )
    .unwrap();
}

/// True for a comment body (text after `#`) that reads like code.
pub fn looks_like_code(body: &str) -> bool {
    let body = body.trim();
    !body.is_empty() && !body.starts_with("gdscan:") && CODE_LIKE.is_match(body)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Code,
    /// `#` comment.
    Comment,
    Doc,
}

fn classify(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.starts_with("##") {
        LineKind::Doc
    } else if trimmed.starts_with('#') {
        LineKind::Comment
    } else {
        LineKind::Code
    }
}

pub struct CommentQuality;

impl CommentQuality {
    fn commented_code(&self, file: &SourceFile, kinds: &[LineKind]) -> Vec<Issue> {
        let mut issues = Vec::new();
        let mut run: Option<(usize, usize)> = None;

        let mut flush = |run: &mut Option<(usize, usize)>| {
            if let Some((start, count)) = run.take() {
                issues.push(
                    Issue::new(
                        self.id(),
                        &file.rel_path,
                        start,
                        "commented_code",
                        format!("{} line(s) of commented-out code", count),
                        Severity::Info,
                    )
                    .with_suggestion("delete it; version control keeps the history"),
                );
            }
        };

        for (idx, raw) in file.lines.iter().enumerate() {
            let is_code = kinds[idx] == LineKind::Comment
                && looks_like_code(raw.trim().trim_start_matches('#'));
            if is_code {
                match run.as_mut() {
                    Some((_, count)) => *count += 1,
                    None => run = Some((idx + 1, 1)),
                }
            } else {
                flush(&mut run);
            }
        }
        flush(&mut run);
        issues
    }
}

impl Check for CommentQuality {
    fn id(&self) -> &'static str {
        "comment_quality"
    }

    fn name(&self) -> &'static str {
        "Comment quality"
    }

    fn category(&self) -> Category {
        Category::Maintenance
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.commented_code")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let mut code_lines = 0usize;
        let mut comment_lines = 0usize;
        let mut doc_lines = 0usize;
        let mut commented_code = 0usize;
        let mut undocumented = 0usize;

        for (file, facts) in ctx.project.sources() {
            let kinds: Vec<LineKind> = file.lines.iter().map(|l| classify(l)).collect();
            for kind in &kinds {
                match kind {
                    LineKind::Code => code_lines += 1,
                    LineKind::Comment => comment_lines += 1,
                    LineKind::Doc => doc_lines += 1,
                    LineKind::Blank => {}
                }
            }

            let blocks = self.commented_code(file, &kinds);
            commented_code += blocks.len();
            out.extend(blocks);

            for (idx, raw) in file.lines.iter().enumerate() {
                if raw.trim() != "#" {
                    continue;
                }
                let neighbour_comment = |i: Option<usize>| {
                    i.and_then(|i| kinds.get(i))
                        .is_some_and(|k| matches!(k, LineKind::Comment | LineKind::Doc))
                };
                if neighbour_comment(idx.checked_sub(1)) || neighbour_comment(Some(idx + 1)) {
                    continue;
                }
                out.push(Issue::new(
                    self.id(),
                    &file.rel_path,
                    idx + 1,
                    "empty_comment",
                    "empty comment",
                    Severity::Info,
                ));
            }

            for f in &facts.functions {
                if f.is_private()
                    || f.has_doc_comment
                    || f.body_lines <= DOC_MIN_LINES
                    || LIFECYCLE_HOOKS.contains(f.name.as_str())
                {
                    continue;
                }
                undocumented += 1;
                out.push(
                    Issue::new(
                        self.id(),
                        &file.rel_path,
                        f.line,
                        "missing_doc_comment",
                        format!("public function {}() has {} lines and no ## doc comment", f.name, f.body_lines),
                        Severity::Info,
                    )
                    .with_suggestion(format!("## Describe what {}() does.", f.name)),
                );
            }
        }

        let total = code_lines + comment_lines + doc_lines;
        let ratio = if total == 0 {
            0.0
        } else {
            ((comment_lines + doc_lines) as f64 / total as f64 * 1000.0).round() / 1000.0
        };

        out.set("code_lines", code_lines);
        out.set("comment_lines", comment_lines);
        out.set("doc_lines", doc_lines);
        out.set("comment_ratio", ratio);
        out.set("commented_code", commented_code);
        out.set("undocumented_functions", undocumented);
        Ok(out)
    }
}
