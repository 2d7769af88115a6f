//! Output formatting for check and suite results.
//!
//! Every formatter renders to a string so the CLI can print it or write it
//! to a file. Supported formats:
//! - Text: fixed-column terminal output, colored when the terminal allows
//! - JSON: `{summary, issues}` per check, the consolidated report per suite
//! - Markdown: run reports and TODO exports
//! - SARIF: 2.1.0 for CI annotations

pub mod json;
pub mod markdown;
pub mod sarif;
pub mod text;

use std::str::FromStr;

use crate::checks::CheckRun;
use crate::orchestrator::SuiteReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
    Markdown,
    Sarif,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "markdown" | "md" => Ok(Format::Markdown),
            "sarif" => Ok(Format::Sarif),
            _ => Err(format!("unknown format: {}", s)),
        }
    }
}

/// Render one check's result.
pub fn render_check(run: &CheckRun, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Text => Ok(text::check(run)),
        Format::Json => json::check(run),
        Format::Markdown => Ok(markdown::check(run)),
        Format::Sarif => sarif::render(std::slice::from_ref(run)),
    }
}

/// Render a suite report.
pub fn render_suite(report: &SuiteReport, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Text => Ok(text::suite(report)),
        Format::Json => json::suite(report),
        Format::Markdown => Ok(markdown::suite(report)),
        Format::Sarif => sarif::render_suite(report),
    }
}

/// Severity order used when grouping issues.
pub(crate) const SEVERITY_ORDER: [crate::checks::Severity; 3] = [
    crate::checks::Severity::Error,
    crate::checks::Severity::Warning,
    crate::checks::Severity::Info,
];

#[cfg(test)]
pub(crate) mod fixture {
    use std::sync::Arc;

    use crate::checks::{self, CheckRun, Runner};
    use crate::config::Config;
    use crate::orchestrator::{self, SuiteOptions, SuiteReport};
    use crate::project::Project;

    pub const HUD: &str = "extends Control\n\
func _process(delta):\n\
\tawait get_tree().create_timer(0.1).timeout\n\
\tprint(\"tick\")\n";

    pub fn project() -> Arc<Project> {
        Arc::new(Project::from_files(Config::default(), &[("ui/hud.gd", HUD)]))
    }

    pub fn run(id: &str) -> CheckRun {
        let check = checks::find(id).unwrap();
        Runner::new().run(&project(), check)
    }

    pub fn suite() -> SuiteReport {
        let mut report = orchestrator::run_suite(project(), &SuiteOptions::default());
        report.generated_utc = "2024-01-01T00:00:00Z".to_string();
        report
    }
}
