//! Unguarded `IDENT["KEY"]` reads.

use phf::phf_set;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::fix::dict_access::smart_default;
use crate::lex::{DictAccess as Access, DictAccessForm};

/// Receivers that are usually arrays or trusted records rather than
/// dictionaries from external data.
pub static SAFE_RECEIVERS: phf::Set<&'static str> = phf_set! {
    "data", "entries", "list", "array", "arr", "items", "result", "results",
    "row", "rows", "args", "params", "matrix", "grid", "cells", "values",
    "keys", "buffer", "stack", "queue", "self",
};

/// True when a bracket read should be reported.
pub fn is_unsafe(access: &Access, extra_safe: &[String]) -> bool {
    let name = access.receiver_name();
    access.form == DictAccessForm::Bracket
        && !access.is_assignment
        && !access.guarded
        && !SAFE_RECEIVERS.contains(name)
        && !extra_safe.iter().any(|s| s == name)
}

pub struct DictAccess;

impl Check for DictAccess {
    fn id(&self) -> &'static str {
        "dict_access"
    }

    fn name(&self) -> &'static str {
        "Dictionary access safety"
    }

    fn category(&self) -> Category {
        Category::DataIntegrity
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.unsafe")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let extra = &ctx.project.config.dict_access.safe_names;
        let mut bracket = 0usize;
        let mut safe_forms = 0usize;
        let mut guarded = 0usize;
        let mut unsafe_count = 0usize;

        for (file, facts) in ctx.project.sources() {
            for access in &facts.dict_accesses {
                if access.is_safe_form() {
                    safe_forms += 1;
                    continue;
                }
                bracket += 1;
                if access.guarded {
                    guarded += 1;
                }
                if !is_unsafe(access, extra) {
                    continue;
                }
                unsafe_count += 1;
                out.push(
                    Issue::new(
                        self.id(),
                        &file.rel_path,
                        access.line,
                        "unsafe_bracket_access",
                        format!("{}[\"{}\"] fails at runtime when the key is missing", access.receiver, access.key),
                        Severity::Warning,
                    )
                    .with_suggestion(format!(
                        "{}.get(\"{}\", {})",
                        access.receiver,
                        access.key,
                        smart_default(&access.key)
                    )),
                );
            }
        }

        out.set("bracket_accesses", bracket);
        out.set("safe_accesses", safe_forms);
        out.set("guarded", guarded);
        out.set("unsafe", unsafe_count);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    #[test]
    fn test_unsafe_reads() {
        let src = "extends Node\n\
func f(config, data, stats):\n\
\tvar name = config[\"player_name\"]\n\
\tvar n = data[\"count\"]\n\
\tstats[\"hp\"] = 3\n\
\tif stats.has(\"mp\") and stats[\"mp\"] > 0:\n\
\t\tpass\n\
\tvar s = stats.get(\"speed\", 1)\n\
\tvar label = \"config['x']\"\n";
        let out = testutil::run(&DictAccess, &[("a.gd", src)]);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].line, 3);
        assert_eq!(
            out.issues[0].suggestion.as_deref(),
            Some("config.get(\"player_name\", \"\")")
        );
        assert_eq!(out.summary["safe_accesses"], 2);
        assert_eq!(out.summary["guarded"], 1);
    }

    #[test]
    fn test_read_in_if_condition_is_guarded() {
        let src = "extends Node\n\
func f(config):\n\
\tif config[\"enabled\"]:\n\
\t\tpass\n\
\telif config[\"fallback\"]:\n\
\t\tpass\n\
\tvar speed = config[\"speed\"] if config.size() > 0 else 1.0\n\
\tvar title = config[\"title\"]\n\
\tprint(\"if \" + config[\"label\"])\n";
        let out = testutil::run(&DictAccess, &[("a.gd", src)]);
        let lines: Vec<usize> = out.issues.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![8, 9]);
        assert_eq!(out.summary["guarded"], 3);
    }
}
