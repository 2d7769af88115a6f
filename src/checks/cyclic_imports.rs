//! Import cycles over the script graph.

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};

pub struct CyclicImports;

impl Check for CyclicImports {
    fn id(&self) -> &'static str {
        "cyclic_imports"
    }

    fn name(&self) -> &'static str {
        "Cyclic imports"
    }

    fn category(&self) -> Category {
        Category::Architecture
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.direct_cycles", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let graph = &ctx.project.index.imports;
        let depth = ctx
            .options
            .threshold
            .unwrap_or(ctx.project.config.cycles.max_depth);
        let cycles = graph.cycles(depth);

        let mut direct = 0usize;
        for cycle in &cycles {
            let first = &cycle[0];
            let second = &cycle[1 % cycle.len()];
            let line = graph.edge(first, second).map(|e| e.line).unwrap_or(0);
            let mut path = cycle.clone();
            path.push(first.clone());
            let (severity, issue_type) = if cycle.len() == 2 {
                direct += 1;
                (Severity::Error, "direct_cycle")
            } else {
                (Severity::Warning, "indirect_cycle")
            };
            out.push(
                Issue::new(
                    self.id(),
                    first,
                    line,
                    issue_type,
                    format!("import cycle of length {}: {}", cycle.len(), path.join(" -> ")),
                    severity,
                )
                .with_suggestion("break the cycle with a signal, an autoload or a late load()"),
            );
        }

        out.set("files", graph.nodes().count());
        out.set("edges", graph.edges().len());
        out.set("cycle_count", cycles.len());
        out.set("direct_cycles", direct);
        out.set("cycles", serde_json::to_value(&cycles)?);
        Ok(out)
    }
}
