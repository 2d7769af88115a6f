//! `await` inside per-frame callbacks and, in strict mode, inside `_ready`.

use std::collections::BTreeMap;

use super::naming::HOT_PATH_HOOKS;
use super::{Category, Check, CheckContext, CheckOutput, Issue, Rating, Threshold};

pub struct AwaitPatterns;

impl Check for AwaitPatterns {
    fn id(&self) -> &'static str {
        "await_patterns"
    }

    fn name(&self) -> &'static str {
        "Await patterns"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.hot_path", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let mut total = 0usize;
        let mut hot_path = 0usize;
        let mut by_function: BTreeMap<String, usize> = BTreeMap::new();

        for (file, facts) in ctx.project.sources() {
            for site in &facts.awaits {
                total += 1;
                let Some(function) = site.function.as_deref() else { continue };
                *by_function.entry(function.to_string()).or_default() += 1;

                if HOT_PATH_HOOKS.contains(function) {
                    hot_path += 1;
                    out.push(
                        Issue::rated(
                            self.id(),
                            &file.rel_path,
                            site.line,
                            "hot_path_await",
                            format!("await {} inside {}() suspends a per-frame callback", site.expr, function),
                            Rating::High,
                        )
                        .with_suggestion("move the awaited work into a separate function or a Timer callback"),
                    );
                } else if ctx.options.strict && function == "_ready" {
                    out.push(
                        Issue::rated(
                            self.id(),
                            &file.rel_path,
                            site.line,
                            "ready_await",
                            format!("await {} inside _ready() delays the ready signal of parents", site.expr),
                            Rating::Medium,
                        )
                        .with_suggestion("defer with call_deferred() or a dedicated init coroutine"),
                    );
                }
            }
        }

        out.set("awaits", total);
        out.set("hot_path", hot_path);
        out.set("by_function", serde_json::to_value(by_function)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{testutil, Severity};

    #[test]
    fn test_await_in_process() {
        let src = "extends Node\nfunc _process(delta):\n\tawait get_tree().create_timer(0.1).timeout\n";
        let out = testutil::run(&AwaitPatterns, &[("a.gd", src)]);
        assert_eq!(out.issues.len(), 1);
        let issue = &out.issues[0];
        assert_eq!(issue.issue_type, "hot_path_await");
        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(issue.rating, Some(Rating::High));
        assert!(issue.message.contains("_process"));
    }

    #[test]
    fn test_await_in_plain_function() {
        let src = "extends Node\nfunc foo():\n\tawait get_tree().create_timer(0.1).timeout\n";
        let out = testutil::run(&AwaitPatterns, &[("a.gd", src)]);
        assert!(out.issues.is_empty());
        assert_eq!(out.summary["awaits"], 1);
    }

    #[test]
    fn test_ready_only_in_strict() {
        let src = "extends Node\nfunc _ready():\n\tawait get_tree().process_frame\n";
        assert!(testutil::run(&AwaitPatterns, &[("a.gd", src)]).issues.is_empty());
        let out = testutil::strict(&AwaitPatterns, &[("a.gd", src)]);
        assert_eq!(testutil::types(&out), vec!["ready_await"]);
        assert_eq!(out.issues[0].rating, Some(Rating::Medium));
    }
}
