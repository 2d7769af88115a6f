//! Repeated numeric literals in function bodies.

use std::collections::{BTreeMap, BTreeSet};

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};

pub struct MagicNumbers;

impl Check for MagicNumbers {
    fn id(&self) -> &'static str {
        "magic_numbers"
    }

    fn name(&self) -> &'static str {
        "Magic numbers"
    }

    fn category(&self) -> Category {
        Category::Maintenance
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.repeated_values")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let project = ctx.project;
        let min = ctx
            .options
            .threshold
            .unwrap_or(project.config.magic_numbers.min_occurrences)
            .max(2);

        let mut by_category: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut literals = 0usize;
        for (_, facts) in project.sources() {
            for n in &facts.numbers {
                literals += 1;
                *by_category.entry(n.category.as_str()).or_default() += 1;
            }
        }

        let mut repeated = Vec::new();
        for (value, sites) in &project.index.magic_numbers {
            if sites.len() < min {
                continue;
            }
            let mut sites: Vec<_> = sites.iter().collect();
            sites.sort();
            let first = sites[0];
            let files: BTreeSet<&str> = sites.iter().map(|s| s.file.as_str()).collect();
            out.push(
                Issue::new(
                    self.id(),
                    &first.file,
                    first.line,
                    "magic_number",
                    format!("{} appears {} times across {} file(s)", value, sites.len(), files.len()),
                    Severity::Info,
                )
                .with_suggestion(format!("const NAME = {}", value)),
            );
            repeated.push(serde_json::json!({
                "value": value,
                "count": sites.len(),
            }));
        }

        out.set("min_occurrences", min);
        out.set("literals", literals);
        out.set("distinct_values", project.index.magic_numbers.len());
        out.set("repeated_values", repeated.len());
        out.set("by_category", serde_json::to_value(by_category)?);
        out.set("values", repeated);
        Ok(out)
    }
}
