//! SARIF 2.1.0 output for CI annotation.
//!
//! Each check becomes a rule whose id is the check id; results carry the
//! issue type in their message so annotations stay readable.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::checks::{CheckRun, Issue, Severity};
use crate::orchestrator::SuiteReport;

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "gdscan";

#[derive(Serialize)]
struct SarifReport {
    version: String,
    #[serde(rename = "$schema")]
    schema: String,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
struct SarifDriver {
    name: String,
    version: String,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
struct SarifRule {
    id: String,
    name: String,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage,
}

#[derive(Serialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifact,
    region: SarifRegion,
}

#[derive(Serialize)]
struct SarifArtifact {
    uri: String,
}

#[derive(Serialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
}

fn level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

fn result(issue: &Issue) -> SarifResult {
    let text = match &issue.suggestion {
        Some(s) => format!("[{}] {} (suggestion: {})", issue.issue_type, issue.message, s),
        None => format!("[{}] {}", issue.issue_type, issue.message),
    };
    SarifResult {
        rule_id: issue.check.clone(),
        level: level(issue.severity).to_string(),
        message: SarifMessage { text },
        locations: vec![SarifLocation {
            physical_location: SarifPhysicalLocation {
                artifact_location: SarifArtifact {
                    uri: issue.file.clone(),
                },
                region: SarifRegion {
                    // SARIF lines are 1-based; file-level issues point at the top.
                    start_line: issue.line.max(1),
                },
            },
        }],
    }
}

fn document<'a>(rules: BTreeMap<&'a str, &'a str>, issues: impl Iterator<Item = &'a Issue>) -> anyhow::Result<String> {
    let rules = rules
        .into_iter()
        .map(|(id, name)| SarifRule {
            id: id.to_string(),
            name: name.to_string(),
            short_description: SarifMessage { text: name.to_string() },
        })
        .collect();
    let report = SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            results: issues.map(result).collect(),
        }],
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn render(runs: &[CheckRun]) -> anyhow::Result<String> {
    let rules = runs.iter().map(|r| (r.id, r.name)).collect();
    document(rules, runs.iter().flat_map(|r| r.issues.iter()))
}

pub fn render_suite(report: &SuiteReport) -> anyhow::Result<String> {
    let rules = report.checks.iter().map(|c| (c.id, c.name)).collect();
    document(rules, report.checks.iter().flat_map(|c| c.issues.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixture;

    #[test]
    fn test_sarif_document() {
        let run = fixture::run("print_statements");
        let text = render(std::slice::from_ref(&run)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], "2.1.0");
        let results = &value["runs"][0]["results"];
        assert_eq!(results[0]["ruleId"], "print_statements");
        assert_eq!(results[0]["level"], "warning");
        assert_eq!(results[0]["locations"][0]["physicalLocation"]["region"]["startLine"], 4);
        assert_eq!(value["runs"][0]["tool"]["driver"]["rules"][0]["id"], "print_statements");
    }
}
