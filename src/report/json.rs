//! JSON output.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::checks::{CheckRun, Issue};
use crate::orchestrator::SuiteReport;

/// Per-check JSON document.
#[derive(Serialize)]
pub struct CheckReport<'a> {
    pub summary: &'a Map<String, Value>,
    pub issues: &'a [Issue],
}

pub fn check(run: &CheckRun) -> anyhow::Result<String> {
    let report = CheckReport {
        summary: &run.summary,
        issues: &run.issues,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn suite(report: &SuiteReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixture;

    #[test]
    fn test_check_shape() {
        let run = fixture::run("await_patterns");
        let text = check(&run).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["issues", "summary"]);
        let issue = &value["issues"][0];
        assert_eq!(issue["file"], "ui/hud.gd");
        assert_eq!(issue["line"], 3);
        assert_eq!(issue["type"], "hot_path_await");
        assert_eq!(issue["severity"], "warning");
        assert!(text.find("\"summary\"").unwrap() < text.find("\"issues\"").unwrap());
    }

    #[test]
    fn test_suite_timestamp_is_last() {
        let report = fixture::suite();
        let text = suite(&report).unwrap();
        let last_key = text.rfind("\"generated_utc\"").unwrap();
        assert!(text.rfind("\"totals\"").unwrap() < last_key);
        assert!(text[last_key..].trim_end().ends_with('}'));
        assert_eq!(text[last_key..].matches('\n').count(), 1);
    }

    #[test]
    fn test_suite_is_deterministic() {
        let a = suite(&fixture::suite()).unwrap();
        let b = suite(&fixture::suite()).unwrap();
        assert_eq!(a, b);
    }
}
