//! Human-readable terminal output with fixed column widths.

use std::fmt::Write as _;

use colored::*;
use serde_json::Value;

use super::SEVERITY_ORDER;
use crate::checks::{CheckRun, Issue, Severity, Status};
use crate::orchestrator::{format_number, SuiteReport};

const FILE_WIDTH: usize = 36;
const TYPE_WIDTH: usize = 26;

fn status_tag(status: Status) -> ColoredString {
    match status {
        Status::Pass => "PASS".green(),
        Status::Warn => "WARN".yellow(),
        Status::Fail => "FAIL".red().bold(),
    }
}

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::Error => "ERROR".red(),
        Severity::Warning => "WARN ".yellow(),
        Severity::Info => "INFO ".blue(),
    }
}

fn location(issue: &Issue) -> String {
    if issue.file.is_empty() {
        "-".to_string()
    } else if issue.line == 0 {
        issue.file.clone()
    } else {
        format!("{}:{}", issue.file, issue.line)
    }
}

/// Summary value on one line; nested values as compact JSON.
fn scalar(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_issues(out: &mut String, issues: &[Issue]) {
    for severity in SEVERITY_ORDER {
        let group: Vec<&Issue> = issues.iter().filter(|i| i.severity == severity).collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {} ({})", severity.as_str().to_uppercase().bold(), group.len());
        for issue in group {
            let _ = writeln!(
                out,
                "    {} {:<fw$} {:<tw$} {}",
                severity_tag(issue.severity),
                location(issue),
                issue.issue_type.dimmed(),
                issue.message,
                fw = FILE_WIDTH,
                tw = TYPE_WIDTH,
            );
            if let Some(suggestion) = &issue.suggestion {
                let _ = writeln!(out, "          {} {}", "->".dimmed(), suggestion.dimmed());
            }
        }
        out.push('\n');
    }
}

/// One check: header, scalar summary counters, issues grouped by severity.
pub fn check(run: &CheckRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}  {}", run.name.bold(), format!("({})", run.id).dimmed(), status_tag(run.status()));
    out.push('\n');

    let scalars: Vec<(&String, &Value)> = run
        .summary
        .iter()
        .filter(|(_, v)| !matches!(v, Value::Array(_) | Value::Object(_)))
        .collect();
    if !scalars.is_empty() {
        let width = scalars.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in scalars {
            let _ = writeln!(out, "  {:<width$}  {}", key, scalar(value), width = width);
        }
        out.push('\n');
    }

    if run.issues.is_empty() {
        let _ = writeln!(out, "  {}", "No issues.".green());
    } else {
        write_issues(&mut out, &run.issues);
    }
    if let Some(failure) = &run.failure {
        let _ = writeln!(out, "  {} {}", "check failed:".red(), failure);
    }
    out
}

/// Suite table: one row per check, then totals.
pub fn suite(report: &SuiteReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "gdscan".cyan().bold(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    let _ = writeln!(out, "  {}{}", "Root: ".dimmed(), report.root);
    let _ = writeln!(out, "  {}{}", "Mode: ".dimmed(), report.mode.as_str());
    out.push('\n');

    let _ = writeln!(
        out,
        "  {:<20} {:<6} {:>6} {:>6} {:>6}  {}",
        "CHECK", "STATUS", "ERROR", "WARN", "INFO", "METRIC"
    );
    for check in &report.checks {
        let _ = writeln!(
            out,
            "  {:<20} {:<6} {:>6} {:>6} {:>6}  {}",
            check.id,
            status_tag(check.status),
            check.counts.error,
            check.counts.warning,
            check.counts.info,
            check.message.dimmed(),
        );
    }
    out.push('\n');

    let t = &report.totals;
    let verdict = if report.passed() { "PASSED".green() } else { "FAILED".red() };
    let _ = writeln!(
        out,
        "  {} checks: {} pass, {} warn, {} fail  |  {} errors, {} warnings, {} info{}  {}",
        t.checks,
        t.pass,
        t.warn,
        t.fail,
        t.errors,
        t.warnings,
        t.info,
        if t.suppressed > 0 {
            format!(" ({} suppressed)", t.suppressed)
        } else {
            String::new()
        },
        verdict
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixture;

    #[test]
    fn test_check_groups_by_severity() {
        colored::control::set_override(false);
        let run = fixture::run("await_patterns");
        let text = check(&run);
        assert!(text.starts_with("Await patterns (await_patterns)  FAIL"));
        assert!(text.contains("  WARNING (1)"));
        assert!(text.contains("ui/hud.gd:3"));
        assert!(text.lines().any(|l| l.starts_with("  hot_path ") && l.ends_with(" 1")));
    }

    #[test]
    fn test_suite_table_has_every_check() {
        colored::control::set_override(false);
        let report = fixture::suite();
        let text = suite(&report);
        for c in &report.checks {
            assert!(text.contains(c.id), "missing row for {}", c.id);
        }
        assert!(text.contains("FAILED"));
    }
}
