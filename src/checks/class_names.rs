//! `class_name` declarations against file names, plus project-wide
//! duplicates.

use serde_json::json;

use super::naming::class_name_for_stem;
use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::project::Layer;

pub struct ClassNames;

impl Check for ClassNames {
    fn id(&self) -> &'static str {
        "class_names"
    }

    fn name(&self) -> &'static str {
        "Class names"
    }

    fn category(&self) -> Category {
        Category::Naming
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.duplicates", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let mut declared = 0usize;
        let mut mismatches = 0usize;

        for (file, facts) in ctx.project.sources() {
            let expected = class_name_for_stem(file.stem());
            match &facts.class_name {
                Some((name, line)) => {
                    declared += 1;
                    if *name != expected {
                        mismatches += 1;
                        out.push(
                            Issue::new(
                                self.id(),
                                &file.rel_path,
                                *line,
                                "class_name_mismatch",
                                format!("class_name '{}' does not match file name (expected '{}')", name, expected),
                                Severity::Info,
                            )
                            .with_suggestion(format!("class_name {}", expected)),
                        );
                    }
                }
                None => {
                    if ctx.options.strict && facts.has_static_functions() && file.layer != Layer::Sim {
                        out.push(
                            Issue::new(
                                self.id(),
                                &file.rel_path,
                                1,
                                "missing_class_name",
                                "script with static functions has no class_name",
                                Severity::Info,
                            )
                            .with_suggestion(format!("class_name {}", expected)),
                        );
                    }
                }
            }
        }

        // Each unordered pair of declaring sites once, reported at the later site.
        let mut pairs = Vec::new();
        for (name, sites) in &ctx.project.index.duplicate_classes {
            for (i, first) in sites.iter().enumerate() {
                for second in &sites[i + 1..] {
                    pairs.push(json!([first.file, second.file]));
                    out.push(Issue::new(
                        self.id(),
                        &second.file,
                        second.line,
                        "duplicate_class_name",
                        format!("class_name '{}' is also declared in {}:{}", name, first.file, first.line),
                        Severity::Error,
                    ));
                }
            }
        }

        out.set("declared", declared);
        out.set("mismatches", mismatches);
        out.set("duplicates", pairs.len());
        out.set("duplicate_pairs", pairs);
        Ok(out)
    }
}
