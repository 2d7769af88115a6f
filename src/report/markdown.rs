//! Markdown output: run reports and per-check exports such as the TODO list.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::Value;

use super::SEVERITY_ORDER;
use crate::checks::{CheckRun, Issue, Status};
use crate::orchestrator::{format_number, SuiteReport};

/// Issues listed per check in a run report before truncating.
const MAX_LISTED: usize = 25;

fn escape(text: &str) -> String {
    text.replace('|', "\\|")
}

fn location(issue: &Issue) -> String {
    if issue.line == 0 {
        format!("`{}`", issue.file)
    } else {
        format!("`{}:{}`", issue.file, issue.line)
    }
}

fn status_badge(status: Status) -> &'static str {
    match status {
        Status::Pass => "✅ pass",
        Status::Warn => "⚠️ warn",
        Status::Fail => "❌ fail",
    }
}

fn issue_item(out: &mut String, issue: &Issue) {
    let _ = write!(out, "- [ ] {} **{}**: {}", location(issue), issue.issue_type, issue.message);
    if let Some(suggestion) = &issue.suggestion {
        let _ = write!(out, " _({})_", suggestion);
    }
    out.push('\n');
}

/// One check as a markdown document. Issues carrying a category (TODO
/// priority, pattern bucket) are grouped by it, the rest by severity.
pub fn check(run: &CheckRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", run.name);
    let _ = writeln!(out, "Status: {}\n", status_badge(run.status()));

    let scalars: Vec<(&String, &Value)> = run
        .summary
        .iter()
        .filter(|(_, v)| !matches!(v, Value::Array(_) | Value::Object(_)))
        .collect();
    if !scalars.is_empty() {
        out.push_str("| Metric | Value |\n|---|---|\n");
        for (key, value) in scalars {
            let value = match value {
                Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
                Value::String(s) => escape(s),
                other => other.to_string(),
            };
            let _ = writeln!(out, "| {} | {} |", key, value);
        }
        out.push('\n');
    }

    if run.issues.is_empty() {
        out.push_str("No issues.\n");
        return out;
    }

    let mut groups: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();
    if run.issues.iter().all(|i| i.category.is_some()) {
        for issue in &run.issues {
            let key = issue.category.clone().unwrap_or_default();
            groups.entry(key).or_default().push(issue);
        }
    } else {
        for (rank, severity) in SEVERITY_ORDER.iter().enumerate() {
            let group: Vec<&Issue> = run.issues.iter().filter(|i| i.severity == *severity).collect();
            if !group.is_empty() {
                groups.insert(format!("{}{}", rank, severity.as_str()), group);
            }
        }
    }

    for (key, issues) in groups {
        let title = key.trim_start_matches(|c: char| c.is_ascii_digit());
        let _ = writeln!(out, "## {} ({})\n", title, issues.len());
        for issue in issues {
            issue_item(&mut out, issue);
        }
        out.push('\n');
    }
    out
}

/// Suite run report: a status table, then the issues of every check that
/// did not pass.
pub fn suite(report: &SuiteReport) -> String {
    let mut out = String::new();
    let t = &report.totals;
    out.push_str("# gdscan report\n\n");
    let _ = writeln!(out, "- Root: `{}`", report.root);
    let _ = writeln!(out, "- Mode: {}", report.mode.as_str());
    let _ = writeln!(
        out,
        "- Checks: {} ({} pass, {} warn, {} fail)",
        t.checks, t.pass, t.warn, t.fail
    );
    let _ = writeln!(out, "- Issues: {} errors, {} warnings, {} info", t.errors, t.warnings, t.info);
    let _ = writeln!(out, "- Generated: {}\n", report.generated_utc);

    out.push_str("| Check | Status | Errors | Warnings | Info | Metric |\n");
    out.push_str("|---|---|---:|---:|---:|---|\n");
    for c in &report.checks {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            c.name,
            status_badge(c.status),
            c.counts.error,
            c.counts.warning,
            c.counts.info,
            escape(&c.message)
        );
    }
    out.push('\n');

    for c in report.checks.iter().filter(|c| c.status != Status::Pass) {
        let _ = writeln!(out, "## {} ({})\n", c.name, status_badge(c.status));
        for issue in c.issues.iter().take(MAX_LISTED) {
            issue_item(&mut out, issue);
        }
        if c.issues.len() > MAX_LISTED {
            let _ = writeln!(out, "- … and {} more", c.issues.len() - MAX_LISTED);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{self, Runner};
    use crate::config::Config;
    use crate::project::Project;
    use crate::report::fixture;
    use std::sync::Arc;

    #[test]
    fn test_todo_export_groups_by_priority() {
        let src = "extends Node\n# TODO: tidy this later\nfunc f():\n\t# FIXME: crashes on empty wave, urgent\n\tpass\n";
        let project = Arc::new(Project::from_files(Config::default(), &[("a.gd", src)]));
        let run = Runner::new().run(&project, checks::find("todos").unwrap());
        let md = check(&run);
        assert!(md.starts_with("# TODO tracker\n"));
        assert!(md.contains("## high (1)"));
        assert!(md.contains("- [ ] `a.gd:4` **fixme**"));
    }

    #[test]
    fn test_suite_lists_failing_checks() {
        let md = suite(&fixture::suite());
        assert!(md.contains("| Await patterns | ❌ fail |"));
        assert!(md.contains("## Await patterns (❌ fail)"));
        assert!(!md.contains("## Naming"));
    }
}
