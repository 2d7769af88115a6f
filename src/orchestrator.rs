//! Suite runs: pick checks, run them, roll statuses up into one report.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::checks::{self, Check, CheckOptions, CheckRun, Issue, Runner, Severity, Status};
use crate::project::Project;

/// Which checks a suite run includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Quick,
    Full,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Quick => "quick",
            Mode::Full => "full",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuiteOptions {
    pub mode: Mode,
    pub strict: bool,
    pub timeout: Duration,
    /// Show a progress bar on an interactive stderr.
    pub progress: bool,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Full,
            strict: false,
            timeout: checks::DEFAULT_TIMEOUT,
            progress: false,
        }
    }
}

/// Issue counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl Counts {
    pub fn of(issues: &[Issue]) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::Error => counts.error += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }
}

/// One check's line in the suite report.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub status: Status,
    /// Dotted path of the threshold metric.
    pub metric: String,
    pub value: f64,
    pub message: String,
    pub counts: Counts,
    pub summary: Map<String, Value>,
    pub issues: Vec<Issue>,
}

impl CheckResult {
    pub fn from_run(run: CheckRun) -> Self {
        let status = run.status();
        let value = run.metric();
        let message = match &run.failure {
            Some(failure) => failure.chars().take(200).collect(),
            None => describe(&run, value),
        };
        Self {
            id: run.id,
            name: run.name,
            category: run.category.as_str(),
            status,
            metric: run.threshold.metric.clone(),
            value,
            message,
            counts: Counts::of(&run.issues),
            summary: run.summary,
            issues: run.issues,
        }
    }
}

fn describe(run: &CheckRun, value: f64) -> String {
    let value = format_number(value);
    match (run.threshold.fail_if_ge, run.threshold.pass_if_ge) {
        (Some(fail), _) => format!("{} = {} (fails at {})", run.threshold.metric, value, format_number(fail)),
        (None, Some(pass)) => format!("{} = {} (passes at {})", run.threshold.metric, value, format_number(pass)),
        (None, None) => format!("{} = {}", run.threshold.metric, value),
    }
}

/// Integers without a fraction, everything else with up to three decimals.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{:.3}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub checks: usize,
    pub pass: usize,
    pub warn: usize,
    pub fail: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub suppressed: usize,
}

/// Consolidated suite report. `generated_utc` is the only volatile field
/// and serializes last.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub root: String,
    pub mode: Mode,
    pub checks: Vec<CheckResult>,
    pub totals: Totals,
    pub generated_utc: String,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.totals.fail == 0
    }

    /// Process exit status: non-zero only for failures under `--ci`.
    pub fn exit_code(&self, ci: bool) -> i32 {
        if ci && !self.passed() {
            1
        } else {
            0
        }
    }
}

/// Checks included in a mode, in registry order.
pub fn select(mode: Mode) -> Vec<Arc<dyn Check>> {
    checks::registry()
        .into_iter()
        .filter(|c| mode == Mode::Full || c.quick())
        .collect()
}

/// Run a suite over a loaded project.
pub fn run_suite(project: Arc<Project>, options: &SuiteOptions) -> SuiteReport {
    let selected = select(options.mode);
    let runner = Runner::new().timeout(options.timeout).options(CheckOptions {
        strict: options.strict,
        ..Default::default()
    });

    let progress = Progress::new(options.progress, selected.len());
    let runs = runner.run_all(&project, &selected, |run| {
        progress.set_message(run.id);
        progress.inc();
    });
    progress.finish();

    let mut results = Vec::with_capacity(runs.len());
    let mut totals = Totals::default();
    for run in runs {
        totals.suppressed += run.suppressed.len();
        let result = CheckResult::from_run(run);
        match result.status {
            Status::Pass => totals.pass += 1,
            Status::Warn => totals.warn += 1,
            Status::Fail => totals.fail += 1,
        }
        totals.errors += result.counts.error;
        totals.warnings += result.counts.warning;
        totals.info += result.counts.info;
        results.push(result);
    }
    totals.checks = results.len();

    info!(
        mode = options.mode.as_str(),
        checks = totals.checks,
        pass = totals.pass,
        warn = totals.warn,
        fail = totals.fail,
        "suite finished"
    );

    SuiteReport {
        root: project.root.display().to_string(),
        mode: options.mode,
        checks: results,
        totals,
        generated_utc: now_utc(),
    }
}

fn now_utc() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Progress bar over the selected checks, drawn on stderr.
struct Progress {
    bar: Option<ProgressBar>,
}

impl Progress {
    fn new(enabled: bool, len: usize) -> Self {
        let show = enabled && std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        let bar = show.then(|| {
            let bar = ProgressBar::new(len as u64);
            if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}") {
                bar.set_style(style);
            }
            bar
        });
        Self { bar }
    }

    fn set_message(&self, msg: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(msg.to_string());
        }
    }

    fn inc(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
