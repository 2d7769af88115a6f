//! Check runner: isolation, timeouts, input errors and suppression.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::suppress::SuppressionIndex;
use super::{metric_value, Category, Check, CheckContext, CheckOptions, Input, Issue, Severity, Status, Threshold};
use crate::project::{InputKind, Project};

/// Default per-check timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest message carried by a `check_error` issue.
const MAX_ERROR_MESSAGE: usize = 200;

/// Outcome of one check.
#[derive(Debug, Clone)]
pub struct CheckRun {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub threshold: Threshold,
    pub summary: Map<String, Value>,
    pub issues: Vec<Issue>,
    pub suppressed: Vec<Issue>,
    /// Set when the check errored, panicked or timed out.
    pub failure: Option<String>,
    pub duration: Duration,
}

impl CheckRun {
    /// Value of the threshold metric.
    pub fn metric(&self) -> f64 {
        metric_value(&self.summary, self.issues.len(), &self.threshold.metric)
    }

    pub fn status(&self) -> Status {
        if self.failure.is_some() {
            return Status::Fail;
        }
        self.threshold.status(self.metric())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Executes checks against a loaded project.
pub struct Runner {
    timeout: Duration,
    options: CheckOptions,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            options: CheckOptions::default(),
        }
    }

    /// Set the per-check timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    /// Run every check in order, collecting suppressions once. `on_done`
    /// sees each run as it finishes.
    pub fn run_all(
        &self,
        project: &Arc<Project>,
        checks: &[Arc<dyn Check>],
        mut on_done: impl FnMut(&CheckRun),
    ) -> Vec<CheckRun> {
        let suppressions = SuppressionIndex::collect(&project.scripts);
        debug!(directives = suppressions.len(), "suppressions collected");
        checks
            .iter()
            .map(|check| {
                let run = self.run_one(project, Arc::clone(check), &suppressions);
                on_done(&run);
                run
            })
            .collect()
    }

    /// Run a single check.
    pub fn run(&self, project: &Arc<Project>, check: Arc<dyn Check>) -> CheckRun {
        let suppressions = SuppressionIndex::collect(&project.scripts);
        self.run_one(project, check, &suppressions)
    }

    fn run_one(&self, project: &Arc<Project>, check: Arc<dyn Check>, suppressions: &SuppressionIndex) -> CheckRun {
        let started = Instant::now();
        let id = check.id();
        let mut threshold = check.threshold();
        if let Some(over) = project.config.threshold_for(id) {
            if over.fail_if_ge.is_some() {
                threshold.fail_if_ge = over.fail_if_ge;
            }
            if over.pass_if_ge.is_some() {
                threshold.pass_if_ge = over.pass_if_ge;
            }
        }

        let (mut summary, mut issues, failure) = match self.execute(project, &check) {
            Ok(output) => (output.summary, output.issues, None),
            Err(message) => {
                warn!(check = id, error = %message, "check failed");
                let issue = Issue::new(id, "", 0, "check_error", truncate(&message), Severity::Error);
                (Map::new(), vec![issue], Some(message))
            }
        };

        issues.extend(self.input_issues(project, check.as_ref()));

        if let Some(file) = &self.options.file {
            let rel = project.relativize(file);
            issues.retain(|i| i.file == rel);
            if !project.has_file(&rel) {
                issues.push(Issue::new(
                    id,
                    &rel,
                    0,
                    "input_error",
                    format!("missing_file: file not found: {}", rel),
                    Severity::Error,
                ));
            }
        }

        let (mut active, suppressed) = suppressions.filter(issues);
        active.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        active.dedup();

        summary.entry("issues").or_insert_with(|| Value::from(active.len()));
        summary.insert("suppressed".to_string(), Value::from(suppressed.len()));

        let run = CheckRun {
            id,
            name: check.name(),
            category: check.category(),
            threshold,
            summary,
            issues: active,
            suppressed,
            failure,
            duration: started.elapsed(),
        };
        debug!(check = id, issues = run.issues.len(), status = %run.status(), "check finished");
        run
    }

    /// Run the check body on its own thread so a panic or a hang cannot take
    /// the suite down. A worker that misses the timeout is detached and left
    /// running until the process exits; its result is discarded.
    fn execute(&self, project: &Arc<Project>, check: &Arc<dyn Check>) -> Result<super::CheckOutput, String> {
        let (tx, rx) = mpsc::channel();
        let project = Arc::clone(project);
        let worker = Arc::clone(check);
        let options = self.options.clone();

        let spawned = thread::Builder::new()
            .name(format!("check-{}", check.id()))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    let ctx = CheckContext {
                        project: &project,
                        options: &options,
                    };
                    worker.run(&ctx)
                }));
                let _ = tx.send(outcome);
            });
        if let Err(e) = spawned {
            return Err(format!("could not start check: {}", e));
        }

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(e))) => Err(format!("{:#}", e)),
            Ok(Err(payload)) => Err(format!("check panicked: {}", panic_message(payload.as_ref()))),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    check = check.id(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "check timed out, abandoning its worker thread"
                );
                Err(format!("check timed out after {}s", self.timeout.as_secs()))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err("check exited without a result".to_string()),
        }
    }

    fn input_issues(&self, project: &Project, check: &dyn Check) -> Vec<Issue> {
        let wanted: Vec<InputKind> = check
            .inputs()
            .iter()
            .map(|input| match input {
                Input::Scripts => InputKind::Script,
                Input::Scenes => InputKind::Scene,
                Input::Data => InputKind::Data,
                Input::ProjectFile => InputKind::ProjectFile,
            })
            .collect();
        project
            .input_errors
            .iter()
            .filter(|e| wanted.contains(&e.input))
            .map(|e| {
                Issue::new(
                    check.id(),
                    &e.file,
                    0,
                    "input_error",
                    format!("{}: {}", e.kind, e.message),
                    Severity::Error,
                )
            })
            .collect()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_MESSAGE {
        message.to_string()
    } else {
        message.chars().take(MAX_ERROR_MESSAGE).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckOutput;
    use crate::config::Config;

    struct Exploding;

    impl Check for Exploding {
        fn id(&self) -> &'static str {
            "exploding"
        }
        fn name(&self) -> &'static str {
            "Exploding"
        }
        fn category(&self) -> Category {
            Category::Maintenance
        }
        fn threshold(&self) -> Threshold {
            Threshold::fail_at("summary.issues", 1.0)
        }
        fn run(&self, _ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
            panic!("{}", "x".repeat(500));
        }
    }

    struct Sleepy;

    impl Check for Sleepy {
        fn id(&self) -> &'static str {
            "sleepy"
        }
        fn name(&self) -> &'static str {
            "Sleepy"
        }
        fn category(&self) -> Category {
            Category::Maintenance
        }
        fn threshold(&self) -> Threshold {
            Threshold::warn_only("summary.issues")
        }
        fn run(&self, _ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
            thread::sleep(Duration::from_secs(2));
            Ok(CheckOutput::new())
        }
    }

    struct Lines;

    impl Check for Lines {
        fn id(&self) -> &'static str {
            "lines"
        }
        fn name(&self) -> &'static str {
            "Lines"
        }
        fn category(&self) -> Category {
            Category::Maintenance
        }
        fn inputs(&self) -> &'static [Input] {
            &[Input::Scripts, Input::Data]
        }
        fn threshold(&self) -> Threshold {
            Threshold::warn_only("summary.issues")
        }
        fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
            let mut out = CheckOutput::new();
            for file in ctx.project.scripts.iter().rev() {
                out.push(Issue::new("lines", &file.rel_path, 2, "line", "second line", Severity::Warning));
                out.push(Issue::new("lines", &file.rel_path, 1, "line", "first line", Severity::Warning));
            }
            Ok(out)
        }
    }

    fn project(files: &[(&str, &str)]) -> Arc<Project> {
        Arc::new(Project::from_files(Config::default(), files))
    }

    #[test]
    fn test_panic_becomes_check_error() {
        let p = project(&[("a.gd", "extends Node\n")]);
        let run = Runner::new().run(&p, Arc::new(Exploding));
        assert_eq!(run.status(), Status::Fail);
        assert_eq!(run.issues.len(), 1);
        assert_eq!(run.issues[0].issue_type, "check_error");
        assert!(run.issues[0].message.chars().count() <= 200);
    }

    #[test]
    fn test_timeout_becomes_check_error() {
        let p = project(&[("a.gd", "extends Node\n")]);
        let run = Runner::new()
            .timeout(Duration::from_millis(50))
            .run(&p, Arc::new(Sleepy));
        assert_eq!(run.status(), Status::Fail);
        assert!(run.issues[0].message.contains("timed out"));
    }

    #[test]
    fn test_issues_sorted_and_suppressed() {
        let p = project(&[
            ("b.gd", "extends Node\n"),
            ("a.gd", "# gdscan:ignore-file line - generated\nextends Node\n"),
        ]);
        let run = Runner::new().run(&p, Arc::new(Lines));
        let got: Vec<(String, usize)> = run.issues.iter().map(|i| (i.file.clone(), i.line)).collect();
        assert_eq!(got, vec![("b.gd".to_string(), 1), ("b.gd".to_string(), 2)]);
        assert_eq!(run.suppressed.len(), 2);
        assert_eq!(run.summary["suppressed"], 2);
    }

    #[test]
    fn test_run_all_keeps_order_and_reports_each_run() {
        let p = project(&[("a.gd", "# gdscan:ignore-file line\nextends Node\n"), ("b.gd", "extends Node\n")]);
        let checks: Vec<Arc<dyn Check>> = vec![Arc::new(Lines), Arc::new(Exploding), Arc::new(Lines)];
        let mut seen = Vec::new();
        let runs = Runner::new().run_all(&p, &checks, |run| seen.push(run.id));
        assert_eq!(seen, vec!["lines", "exploding", "lines"]);
        let ids: Vec<&str> = runs.iter().map(|r| r.id).collect();
        assert_eq!(ids, seen);
        assert_eq!(runs[0].suppressed.len(), 2);
        assert_eq!(runs[2].issues.len(), 2);
        assert_eq!(runs[1].status(), Status::Fail);
    }

    #[test]
    fn test_input_errors_attach_to_consuming_checks() {
        let p = project(&[("a.gd", "extends Node\n"), ("data/bad.json", "{ nope")]);
        let run = Runner::new().run(&p, Arc::new(Lines));
        let input: Vec<&Issue> = run.issues.iter().filter(|i| i.issue_type == "input_error").collect();
        assert_eq!(input.len(), 1);
        assert_eq!(input[0].file, "data/bad.json");
        assert_eq!(input[0].line, 0);
        assert!(input[0].message.starts_with("malformed_json"));
    }

    #[test]
    fn test_file_filter() {
        let p = project(&[("a.gd", "extends Node\n"), ("b.gd", "extends Node\n")]);
        let options = CheckOptions {
            file: Some("res://b.gd".to_string()),
            ..Default::default()
        };
        let run = Runner::new().options(options).run(&p, Arc::new(Lines));
        assert!(run.issues.iter().all(|i| i.file == "b.gd"));

        let missing = CheckOptions {
            file: Some("nope.gd".to_string()),
            ..Default::default()
        };
        let run = Runner::new().options(missing).run(&p, Arc::new(Lines));
        assert_eq!(run.issues.len(), 1);
        assert_eq!(run.issues[0].issue_type, "input_error");
    }
}
