//! Core types shared by every check.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::project::{Layer, Project};

/// Severity levels for issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Internal rating used by the pattern checks. High and medium findings
/// surface as warnings, low ones as info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    High,
    Medium,
    Low,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::High => "high",
            Rating::Medium => "medium",
            Rating::Low => "low",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Rating::High | Rating::Medium => Severity::Warning,
            Rating::Low => Severity::Info,
        }
    }
}

/// Concern a check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Naming,
    Structure,
    DataIntegrity,
    Godot,
    Performance,
    Architecture,
    Maintenance,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Naming => "naming",
            Category::Structure => "structure",
            Category::DataIntegrity => "data_integrity",
            Category::Godot => "godot",
            Category::Performance => "performance",
            Category::Architecture => "architecture",
            Category::Maintenance => "maintenance",
        }
    }
}

/// Project inputs a check consumes. Input errors for these inputs are
/// attached to the check's issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Scripts,
    Scenes,
    Data,
    ProjectFile,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub file: String,
    pub line: usize,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    pub check: String,
}

impl Issue {
    pub fn new(
        check: &str,
        file: &str,
        line: usize,
        issue_type: &str,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            file: file.to_string(),
            line,
            issue_type: issue_type.to_string(),
            message: message.into(),
            severity,
            suggestion: None,
            category: None,
            rating: None,
            check: check.to_string(),
        }
    }

    /// Issue whose severity derives from an internal rating.
    pub fn rated(
        check: &str,
        file: &str,
        line: usize,
        issue_type: &str,
        message: impl Into<String>,
        rating: Rating,
    ) -> Self {
        let mut issue = Self::new(check, file, line, issue_type, message, rating.severity());
        issue.rating = Some(rating);
        issue
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sort key: file, line, type, message.
    pub fn sort_key(&self) -> (&str, usize, &str, &str) {
        (&self.file, self.line, &self.issue_type, &self.message)
    }
}

/// Pass/fail outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Threshold against one named metric in a check's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Threshold {
    /// Dotted path such as `summary.by_priority.high`.
    pub metric: String,
    pub fail_if_ge: Option<f64>,
    pub pass_if_ge: Option<f64>,
}

impl Threshold {
    pub fn fail_at(metric: &str, value: f64) -> Self {
        Self {
            metric: metric.to_string(),
            fail_if_ge: Some(value),
            pass_if_ge: None,
        }
    }

    /// Never fails; warns while the metric is non-zero.
    pub fn warn_only(metric: &str) -> Self {
        Self {
            metric: metric.to_string(),
            fail_if_ge: None,
            pass_if_ge: None,
        }
    }

    /// Status for a metric value. `fail_if_ge` wins; with `pass_if_ge` the
    /// metric must reach it to pass; otherwise any non-zero value warns.
    pub fn status(&self, metric: f64) -> Status {
        if let Some(fail) = self.fail_if_ge {
            if metric >= fail {
                return Status::Fail;
            }
        }
        match self.pass_if_ge {
            Some(pass) if metric >= pass => Status::Pass,
            Some(_) => Status::Warn,
            None if metric > 0.0 => Status::Warn,
            None => Status::Pass,
        }
    }
}

/// Per-invocation options shared by all checks.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Expand the rule set or lower thresholds.
    pub strict: bool,
    /// Restrict issues to one project-relative file.
    pub file: Option<String>,
    /// Check-specific numeric threshold override.
    pub threshold: Option<usize>,
    /// Restrict layer-based checks to one layer.
    pub layer: Option<Layer>,
}

/// What a check sees while running.
pub struct CheckContext<'a> {
    pub project: &'a Project,
    pub options: &'a CheckOptions,
}

/// Summary counters plus issues.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckOutput {
    pub summary: Map<String, Value>,
    pub issues: Vec<Issue>,
}

impl CheckOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a summary counter.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.summary.insert(key.to_string(), value.into());
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }
}

/// A pluggable analyzer.
pub trait Check: Send + Sync {
    /// Stable identifier, used on the command line and in reports.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn category(&self) -> Category;

    fn inputs(&self) -> &'static [Input] {
        &[Input::Scripts]
    }

    /// Included in `--quick` suite runs.
    fn quick(&self) -> bool {
        false
    }

    fn threshold(&self) -> Threshold;

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput>;
}

/// Look up a dotted metric path (`summary.a.b`, or `issues` for the issue
/// count) in a summary. Missing or non-numeric values read as zero.
pub fn metric_value(summary: &Map<String, Value>, issue_count: usize, path: &str) -> f64 {
    let path = path.strip_prefix("summary.").unwrap_or(path);
    if path == "issues" && !summary.contains_key("issues") {
        return issue_count as f64;
    }
    let mut parts = path.split('.');
    let Some(first) = parts.next() else { return 0.0 };
    let mut current = match summary.get(first) {
        Some(v) => v,
        None => return 0.0,
    };
    for part in parts {
        current = match current.get(part) {
            Some(v) => v,
            None => return 0.0,
        };
    }
    match current {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Array(a) => a.len() as f64,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_threshold_status() {
        let t = Threshold::fail_at("summary.errors", 1.0);
        assert_eq!(t.status(0.0), Status::Pass);
        assert_eq!(t.status(1.0), Status::Fail);

        let warn = Threshold::warn_only("summary.issues");
        assert_eq!(warn.status(0.0), Status::Pass);
        assert_eq!(warn.status(3.0), Status::Warn);

        let ratio = Threshold {
            metric: "summary.ratio".to_string(),
            fail_if_ge: None,
            pass_if_ge: Some(0.1),
        };
        assert_eq!(ratio.status(0.2), Status::Pass);
        assert_eq!(ratio.status(0.05), Status::Warn);
    }

    #[test]
    fn test_metric_value_paths() {
        let summary = json!({"by_priority": {"high": 2}, "cycles": [1, 2, 3]});
        let map = summary.as_object().unwrap();
        assert_eq!(metric_value(map, 0, "summary.by_priority.high"), 2.0);
        assert_eq!(metric_value(map, 0, "summary.cycles"), 3.0);
        assert_eq!(metric_value(map, 7, "summary.issues"), 7.0);
        assert_eq!(metric_value(map, 0, "summary.missing.key"), 0.0);
    }

    #[test]
    fn test_issue_serialization_order() {
        let issue = Issue::rated("await_patterns", "a.gd", 3, "hot_path_await", "await in _process", Rating::High)
            .with_suggestion("move the await out of the frame callback");
        let text = serde_json::to_string(&issue).unwrap();
        assert!(text.starts_with(r#"{"file":"a.gd","line":3,"type":"hot_path_await""#));
        assert!(text.contains(r#""severity":"warning""#));
        assert!(!text.contains("category"));
    }
}
