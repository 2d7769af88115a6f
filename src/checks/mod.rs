//! Pluggable checks over a loaded project.
//!
//! Every check is a unit struct implementing [`Check`]. The registry below
//! fixes the run order; the [`Runner`] adds isolation, input errors,
//! suppressions and sorting on top of what a check returns.

mod types;

pub mod runner;
pub mod suppress;

pub mod autoloads;
pub mod await_patterns;
pub mod class_names;
pub mod comment_quality;
pub mod complexity;
pub mod coupling;
pub mod cyclic_imports;
pub mod dead_code;
pub mod dict_access;
pub mod dict_keys;
pub mod duplicates;
pub mod exports;
pub mod godot_patterns;
pub mod inheritance;
pub mod input_actions;
pub mod json_refs;
pub mod magic_numbers;
pub mod match_statements;
pub mod method_visibility;
pub mod naming;
pub mod node_refs;
pub mod preload_patterns;
pub mod print_statements;
pub mod scene_health;
pub mod signals;
pub mod state_mutation;
pub mod todos;
pub mod tweens;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use runner::{CheckRun, Runner, DEFAULT_TIMEOUT};
pub use suppress::{parse_suppressions, Scope, Suppression, SuppressionIndex};
pub use types::*;

/// Every check, in run order.
pub fn registry() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(naming::Naming),
        Arc::new(class_names::ClassNames),
        Arc::new(inheritance::Inheritance),
        Arc::new(coupling::Coupling),
        Arc::new(cyclic_imports::CyclicImports),
        Arc::new(autoloads::Autoloads),
        Arc::new(complexity::Complexity),
        Arc::new(exports::Exports),
        Arc::new(dict_access::DictAccess),
        Arc::new(match_statements::MatchStatements),
        Arc::new(await_patterns::AwaitPatterns),
        Arc::new(node_refs::NodeRefs),
        Arc::new(signals::Signals),
        Arc::new(input_actions::InputActions),
        Arc::new(json_refs::JsonRefs),
        Arc::new(godot_patterns::GodotPatterns),
        Arc::new(state_mutation::StateMutation),
        Arc::new(duplicates::Duplicates),
        Arc::new(todos::Todos),
        Arc::new(print_statements::PrintStatements),
        Arc::new(preload_patterns::PreloadPatterns),
        Arc::new(tweens::Tweens),
        Arc::new(method_visibility::MethodVisibility),
        Arc::new(comment_quality::CommentQuality),
        Arc::new(dead_code::DeadCode),
        Arc::new(scene_health::SceneHealth),
        Arc::new(magic_numbers::MagicNumbers),
        Arc::new(dict_keys::DictKeys),
    ]
}

/// Look up a check by id. Dashes and underscores are interchangeable.
pub fn find(id: &str) -> Option<Arc<dyn Check>> {
    let wanted = id.replace('-', "_");
    registry().into_iter().find(|c| c.id() == wanted)
}

/// Per-severity counters, added to summaries that group by severity.
pub fn severity_counts(issues: &[Issue]) -> BTreeMap<&'static str, usize> {
    let mut counts: BTreeMap<&'static str, usize> =
        [("error", 0), ("warning", 0), ("info", 0)].into_iter().collect();
    for issue in issues {
        *counts.entry(issue.severity.as_str()).or_default() += 1;
    }
    counts
}

/// Per-rating counters for checks that use internal ratings.
pub fn rating_counts(issues: &[Issue]) -> BTreeMap<&'static str, usize> {
    let mut counts: BTreeMap<&'static str, usize> =
        [("high", 0), ("medium", 0), ("low", 0)].into_iter().collect();
    for issue in issues {
        if let Some(rating) = issue.rating {
            *counts.entry(rating.as_str()).or_default() += 1;
        }
    }
    counts
}

/// Counters keyed by issue type.
pub fn type_counts(issues: &[Issue]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.issue_type.clone()).or_default() += 1;
    }
    counts
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::config::Config;
    use crate::project::Project;

    pub fn project(files: &[(&str, &str)]) -> Project {
        Project::from_files(Config::default(), files)
    }

    pub fn run_with(check: &dyn Check, project: &Project, options: &CheckOptions) -> CheckOutput {
        let ctx = CheckContext { project, options };
        let mut out = check.run(&ctx).unwrap();
        out.issues.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        out
    }

    /// Run a check over in-memory files with default options.
    pub fn run(check: &dyn Check, files: &[(&str, &str)]) -> CheckOutput {
        run_with(check, &project(files), &CheckOptions::default())
    }

    pub fn strict(check: &dyn Check, files: &[(&str, &str)]) -> CheckOutput {
        let options = CheckOptions {
            strict: true,
            ..Default::default()
        };
        run_with(check, &project(files), &options)
    }

    pub fn types(out: &CheckOutput) -> Vec<&str> {
        out.issues.iter().map(|i| i.issue_type.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_registry_ids_unique_and_findable() {
        let checks = registry();
        let ids: BTreeSet<&str> = checks.iter().map(|c| c.id()).collect();
        assert_eq!(ids.len(), checks.len());
        assert!(find("cyclic-imports").is_some());
        assert!(find("nope").is_none());
        assert!(checks.iter().any(|c| c.quick()));
    }
}
