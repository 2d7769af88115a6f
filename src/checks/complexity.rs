//! Function length, statement counts, nesting depth and file length.

use serde_json::json;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};

pub struct Complexity;

impl Check for Complexity {
    fn id(&self) -> &'static str {
        "complexity"
    }

    fn name(&self) -> &'static str {
        "Function complexity"
    }

    fn category(&self) -> Category {
        Category::Structure
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.long_functions")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let cfg = &ctx.project.config.complexity;
        let max_lines = ctx.options.threshold.unwrap_or(cfg.max_lines);
        let soft_lines = if ctx.options.strict {
            cfg.soft_lines.min(max_lines) * 2 / 3
        } else {
            cfg.soft_lines.min(max_lines)
        };

        let mut functions = 0usize;
        let mut total_lines = 0usize;
        let mut total_statements = 0usize;
        let mut long = 0usize;
        let mut longest = json!(null);
        let mut longest_len = 0usize;

        for (file, facts) in ctx.project.sources() {
            if file.lines.len() > cfg.max_file_lines {
                out.push(
                    Issue::new(
                        self.id(),
                        &file.rel_path,
                        1,
                        "long_file",
                        format!("file has {} lines (limit {})", file.lines.len(), cfg.max_file_lines),
                        Severity::Info,
                    )
                    .with_suggestion("split the script by responsibility"),
                );
            }

            for f in &facts.functions {
                functions += 1;
                total_lines += f.body_lines;
                total_statements += f.statements;
                if f.body_lines > longest_len {
                    longest_len = f.body_lines;
                    longest = json!({"file": file.rel_path, "function": f.name, "lines": f.body_lines});
                }

                if f.body_lines > max_lines {
                    long += 1;
                    out.push(
                        Issue::new(
                            self.id(),
                            &file.rel_path,
                            f.line,
                            "long_function",
                            format!(
                                "function '{}' is {} lines ({} statements), limit {}",
                                f.name, f.body_lines, f.statements, max_lines
                            ),
                            Severity::Warning,
                        )
                        .with_suggestion("extract helper functions"),
                    );
                } else if f.body_lines > soft_lines {
                    out.push(Issue::new(
                        self.id(),
                        &file.rel_path,
                        f.line,
                        "function_length",
                        format!("function '{}' is {} lines (soft limit {})", f.name, f.body_lines, soft_lines),
                        Severity::Info,
                    ));
                }

                if f.max_nesting > cfg.max_nesting {
                    out.push(
                        Issue::new(
                            self.id(),
                            &file.rel_path,
                            f.line,
                            "deep_nesting",
                            format!(
                                "function '{}' nests {} levels deep (limit {})",
                                f.name, f.max_nesting, cfg.max_nesting
                            ),
                            Severity::Info,
                        )
                        .with_suggestion("use early returns or extract the inner block"),
                    );
                }
            }
        }

        let average = if functions == 0 {
            0.0
        } else {
            (total_lines as f64 / functions as f64 * 10.0).round() / 10.0
        };
        out.set("functions", functions);
        out.set("average_lines", average);
        out.set("statements", total_statements);
        out.set("long_functions", long);
        out.set("longest", longest);
        out.set("max_lines", max_lines);
        out.set("by_severity", serde_json::to_value(super::severity_counts(&out.issues))?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    fn function_with_body(lines: usize) -> String {
        let mut src = String::from("extends Node\n\nfunc big():\n");
        for i in 0..lines {
            src.push_str(&format!("\tvar v{} = {}\n", i, i));
        }
        src
    }

    #[test]
    fn test_length_boundary() {
        let at = function_with_body(50);
        let out = testutil::run(&Complexity, &[("a.gd", &at)]);
        assert!(out.issues.iter().all(|i| i.issue_type != "long_function"));
        assert_eq!(out.summary["long_functions"], 0);

        let over = function_with_body(51);
        let out = testutil::run(&Complexity, &[("a.gd", &over)]);
        let long: Vec<&Issue> = out.issues.iter().filter(|i| i.issue_type == "long_function").collect();
        assert_eq!(long.len(), 1);
        assert_eq!(long[0].line, 3);
        assert_eq!(long[0].severity, Severity::Warning);
    }

    #[test]
    fn test_soft_limit_is_info() {
        let src = function_with_body(35);
        let out = testutil::run(&Complexity, &[("a.gd", &src)]);
        assert_eq!(testutil::types(&out), vec!["function_length"]);
        assert_eq!(out.issues[0].severity, Severity::Info);
    }

    #[test]
    fn test_deep_nesting() {
        let src = "func f(a):\n\tif a:\n\t\tfor b in a:\n\t\t\twhile b:\n\t\t\t\tif b:\n\t\t\t\t\tmatch b:\n\t\t\t\t\t\t_:\n\t\t\t\t\t\t\tpass\n";
        let out = testutil::run(&Complexity, &[("a.gd", src)]);
        assert_eq!(testutil::types(&out), vec!["deep_nesting"]);
    }
}
