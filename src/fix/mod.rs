//! Line-based auto-fixers.
//!
//! A fixer maps a script's text to new text. Both fixers are idempotent and
//! keep the file's line endings and trailing newline.

pub mod dict_access;
pub mod unused;

use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::Config;
use crate::project::Project;

pub use dict_access::{smart_default, DictAccessFixer};
pub use unused::UnusedPreloadFixer;

/// One rewritten line. `after` is `None` when the line was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
    pub line: usize,
    pub before: String,
    pub after: Option<String>,
}

/// Result of fixing one file.
#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub file: String,
    pub fixed: String,
    pub changes: Vec<LineChange>,
}

impl FixOutcome {
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

pub trait Fixer {
    fn id(&self) -> &'static str;

    /// Rewrite lines. Returning `None` for a line removes it.
    fn fix_lines(&self, lines: &[String], config: &Config) -> Vec<Option<String>>;
}

/// Fixers by command-line name.
pub fn find(id: &str) -> Option<Box<dyn Fixer>> {
    match id.replace('_', "-").as_str() {
        "dict-access" => Some(Box::new(DictAccessFixer)),
        "unused-preloads" => Some(Box::new(UnusedPreloadFixer)),
        _ => None,
    }
}

pub const FIXERS: &[&str] = &["dict-access", "unused-preloads"];

/// Apply a fixer to text, keeping line endings and the trailing newline.
pub fn fix_text(fixer: &dyn Fixer, rel_path: &str, text: &str, config: &Config) -> FixOutcome {
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let trailing = text.ends_with('\n');
    let lines: Vec<String> = text.lines().map(String::from).collect();
    let rewritten = fixer.fix_lines(&lines, config);

    let mut changes = Vec::new();
    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    for (idx, (before, after)) in lines.iter().zip(rewritten.iter()).enumerate() {
        match after {
            Some(after) => {
                if after != before {
                    changes.push(LineChange {
                        line: idx + 1,
                        before: before.clone(),
                        after: Some(after.clone()),
                    });
                }
                kept.push(after);
            }
            None => changes.push(LineChange {
                line: idx + 1,
                before: before.clone(),
                after: None,
            }),
        }
    }

    let fixed = if changes.is_empty() {
        text.to_string()
    } else {
        let mut joined = kept.join(newline);
        if trailing {
            joined.push_str(newline);
        }
        joined
    };

    FixOutcome {
        file: rel_path.to_string(),
        fixed,
        changes,
    }
}

/// Run a fixer over the project (or one file) and write the results unless
/// `dry_run` is set.
pub fn apply(project: &Project, fixer: &dyn Fixer, file: Option<&str>, dry_run: bool) -> anyhow::Result<Vec<FixOutcome>> {
    let wanted = file.map(|f| project.relativize(f));
    if let Some(rel) = &wanted {
        if project.script(rel).is_none() {
            anyhow::bail!("file not found: {}", rel);
        }
    }

    let mut outcomes = Vec::new();
    for script in &project.scripts {
        if wanted.as_deref().is_some_and(|w| w != script.rel_path) {
            continue;
        }
        let outcome = fix_text(fixer, &script.rel_path, &script.text, &project.config);
        if !outcome.changed() {
            continue;
        }
        debug!(fixer = fixer.id(), file = %script.rel_path, changes = outcome.changes.len(), "fixed");
        if !dry_run {
            write_file(&project.root.join(&script.rel_path), &outcome.fixed)?;
        }
        outcomes.push(outcome);
    }
    info!(fixer = fixer.id(), files = outcomes.len(), dry_run, "fix complete");
    Ok(outcomes)
}

fn write_file(path: &Path, text: &str) -> anyhow::Result<()> {
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}
