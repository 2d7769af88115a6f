//! Afferent/efferent coupling per script and layer-ordering violations.

use std::collections::BTreeMap;

use serde_json::json;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::index::Resolution;
use crate::lex::RefKind;
use crate::project::Layer;

/// A dependency that points from a lower layer to a higher one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerViolation {
    pub from: String,
    pub to: String,
    pub line: usize,
    pub reason: String,
}

pub struct Coupling;

impl Coupling {
    /// Script-to-script dependencies from imports and resolved class-name
    /// uses, keyed by (from, to) with the first line.
    fn dependencies(ctx: &CheckContext<'_>) -> BTreeMap<(String, String), usize> {
        let index = &ctx.project.index;
        let mut deps: BTreeMap<(String, String), usize> = BTreeMap::new();
        for edge in index.imports.edges() {
            let line = deps.entry((edge.from.clone(), edge.to.clone())).or_insert(edge.line);
            *line = (*line).min(edge.line);
        }
        for r in index.references_of(RefKind::ClassName) {
            if let Resolution::Resolved(target) = &r.resolution {
                if target != &r.reference.file && target.ends_with(".gd") {
                    let line = deps
                        .entry((r.reference.file.clone(), target.clone()))
                        .or_insert(r.reference.line);
                    *line = (*line).min(r.reference.line);
                }
            }
        }
        deps
    }
}

pub fn layer_violation(from: &str, to: &str, line: usize) -> Option<LayerViolation> {
    let from_layer = Layer::from_rel_path(from);
    let to_layer = Layer::from_rel_path(to);
    match (from_layer.rank(), to_layer.rank()) {
        (Some(a), Some(b)) if a < b => Some(LayerViolation {
            from: from.to_string(),
            to: to.to_string(),
            line,
            reason: format!("{} -> {}", from_layer, to_layer),
        }),
        _ => None,
    }
}

impl Check for Coupling {
    fn id(&self) -> &'static str {
        "coupling"
    }

    fn name(&self) -> &'static str {
        "Coupling and layering"
    }

    fn category(&self) -> Category {
        Category::Architecture
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.layer_violation_count", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let max_efferent = ctx
            .options
            .threshold
            .unwrap_or(ctx.project.config.coupling.max_efferent);
        let deps = Self::dependencies(ctx);

        let mut efferent: BTreeMap<&str, usize> = BTreeMap::new();
        let mut afferent: BTreeMap<&str, usize> = BTreeMap::new();
        for (from, to) in deps.keys() {
            *efferent.entry(from.as_str()).or_default() += 1;
            *afferent.entry(to.as_str()).or_default() += 1;
        }

        let mut metrics = serde_json::Map::new();
        for file in &ctx.project.scripts {
            let rel = file.rel_path.as_str();
            let e = efferent.get(rel).copied().unwrap_or(0);
            let a = afferent.get(rel).copied().unwrap_or(0);
            let instability = if a + e == 0 {
                0.0
            } else {
                e as f64 / (a + e) as f64
            };
            metrics.insert(
                rel.to_string(),
                json!({
                    "afferent": a,
                    "efferent": e,
                    "instability": (instability * 100.0).round() / 100.0,
                }),
            );
            if e > max_efferent {
                out.push(
                    Issue::new(
                        self.id(),
                        rel,
                        1,
                        "high_coupling",
                        format!("depends on {} scripts (limit {})", e, max_efferent),
                        Severity::Warning,
                    )
                    .with_suggestion("split the script or route through a signal bus"),
                );
            }
        }

        let mut violations = Vec::new();
        for ((from, to), line) in &deps {
            if let Some(layer) = ctx.options.layer {
                if Layer::from_rel_path(from) != layer {
                    continue;
                }
            }
            if let Some(v) = layer_violation(from, to, *line) {
                out.push(Issue::new(
                    self.id(),
                    &v.from,
                    v.line,
                    "layer_violation",
                    format!("{} depends on {} ({})", v.from, v.to, v.reason),
                    Severity::Error,
                ));
                violations.push(json!({
                    "from": v.from,
                    "to": v.to,
                    "line": v.line,
                    "reason": v.reason,
                }));
            }
        }

        out.set("files", metrics.len());
        out.set("dependencies", deps.len());
        out.set("layer_violation_count", violations.len());
        out.set("layer_violations", violations);
        out.set("metrics", metrics);
        Ok(out)
    }
}
