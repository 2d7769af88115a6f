//! Inheritance chains resolved through `extends` and the class map.

use std::collections::BTreeSet;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::index::builtins::INHERITANCE_ROOTS;
use crate::lex::FileFacts;
use crate::project::source::resolve_resource;
use crate::project::Project;

/// A resolved chain, starting with the script itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub links: Vec<String>,
    /// The walk came back to a script it had already visited.
    pub cycle: bool,
}

impl Chain {
    /// Number of `extends` hops.
    pub fn depth(&self) -> usize {
        self.links.len().saturating_sub(1)
    }
}

fn label(project: &Project, rel_path: &str) -> String {
    project
        .index
        .class_by_file
        .get(rel_path)
        .cloned()
        .unwrap_or_else(|| rel_path.to_string())
}

/// Walk `extends` from a script until a root, an engine class, an
/// unresolvable name or a revisit.
pub fn resolve_chain(project: &Project, facts: &FileFacts) -> Chain {
    let mut links = vec![label(project, &facts.rel_path)];
    let mut visited: BTreeSet<String> = BTreeSet::new();
    visited.insert(facts.rel_path.clone());

    let mut current_file = facts.rel_path.clone();
    let mut current = facts.extends.clone();
    let mut cycle = false;

    while let Some(ext) = current.take() {
        let (name, next_file) = if ext.is_path {
            match resolve_resource(&current_file, &ext.target) {
                Some(path) => (label(project, &path), Some(path)),
                None => (ext.target.clone(), None),
            }
        } else {
            (ext.target.clone(), project.index.class_file(&ext.target).map(String::from))
        };
        links.push(name.clone());
        if INHERITANCE_ROOTS.contains(name.as_str()) {
            break;
        }
        let Some(next) = next_file else { break };
        if !visited.insert(next.clone()) {
            cycle = true;
            break;
        }
        current = project.script(&next).and_then(|(_, f)| f.extends.clone());
        current_file = next;
    }

    Chain { links, cycle }
}

pub struct Inheritance;

impl Check for Inheritance {
    fn id(&self) -> &'static str {
        "inheritance"
    }

    fn name(&self) -> &'static str {
        "Inheritance depth"
    }

    fn category(&self) -> Category {
        Category::Structure
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.cycles", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let limit = ctx
            .options
            .threshold
            .unwrap_or(ctx.project.config.inheritance.max_depth);
        let mut deepest = 0usize;
        let mut deep = 0usize;
        let mut cycles = 0usize;

        for (file, facts) in ctx.project.sources() {
            let Some(ext) = &facts.extends else { continue };
            let chain = resolve_chain(ctx.project, facts);
            deepest = deepest.max(chain.depth());

            if chain.cycle {
                cycles += 1;
                out.push(Issue::new(
                    self.id(),
                    &file.rel_path,
                    ext.line,
                    "inheritance_cycle",
                    format!("extends cycle: {}", chain.links.join(" -> ")),
                    Severity::Error,
                ));
            } else if chain.depth() > limit {
                deep += 1;
                out.push(
                    Issue::new(
                        self.id(),
                        &file.rel_path,
                        ext.line,
                        "deep_inheritance",
                        format!(
                            "inheritance depth {} exceeds {}: {}",
                            chain.depth(),
                            limit,
                            chain.links.join(" -> ")
                        ),
                        Severity::Warning,
                    )
                    .with_suggestion("prefer composition over another subclass level"),
                );
            }
        }

        out.set("max_depth", deepest);
        out.set("deep_chains", deep);
        out.set("cycles", cycles);
        out.set("limit", limit);
        Ok(out)
    }
}
