//! Writes to shared game state from outside the simulation layer.

use std::collections::BTreeMap;

use regex::Regex;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::lex::{code_part, is_inside_string_literal};
use crate::project::Layer;

/// Global-state fields watched when the config does not name its own.
pub const DEFAULT_FIELDS: &[&str] = &[
    "gold",
    "hp",
    "lives",
    "score",
    "wave",
    "day",
    "phase",
    "resources",
    "buildings",
    "structures",
    "towers",
    "enemies",
    "inventory",
    "upgrades",
    "research",
    "threat",
    "lesson_progress",
    "typing_stats",
    "unlocked",
    "flags",
];

const MUTATING_METHODS: &str =
    "append|append_array|push_back|push_front|pop_back|pop_front|erase|clear|insert|remove_at|merge|sort|sort_custom|resize|fill|assign|shuffle|reverse";

/// Regex for assignments and mutating calls on `state.FIELD` or
/// `_state.FIELD`, with optional subscripts.
pub fn mutation_regex(fields: &[&str]) -> Result<Regex, regex::Error> {
    let names = fields.iter().map(|f| regex::escape(f)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(
        r"\b_?state\.({})((?:\[[^\]]*\])*)\s*(?:([-+*/%]?=)[^=]|\.({})\s*\()",
        names, MUTATING_METHODS
    ))
}

pub struct StateMutation;

impl Check for StateMutation {
    fn id(&self) -> &'static str {
        "state_mutation"
    }

    fn name(&self) -> &'static str {
        "State mutation layering"
    }

    fn category(&self) -> Category {
        Category::Architecture
    }

    fn threshold(&self) -> Threshold {
        Threshold::fail_at("summary.violations", 1.0)
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let configured = &ctx.project.config.state.fields;
        let fields: Vec<&str> = if configured.is_empty() {
            DEFAULT_FIELDS.to_vec()
        } else {
            configured.iter().map(String::as_str).collect()
        };
        let pattern = mutation_regex(&fields)?;

        let mut total = 0usize;
        let mut by_field: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_layer: BTreeMap<&'static str, usize> = BTreeMap::new();

        for (file, _) in ctx.project.sources() {
            let allowed = matches!(file.layer, Layer::Sim | Layer::Tests);
            for (idx, raw) in file.lines.iter().enumerate() {
                let code = code_part(raw);
                if !code.contains("state.") {
                    continue;
                }
                for caps in pattern.captures_iter(code) {
                    let Some(m) = caps.get(0) else { continue };
                    if is_inside_string_literal(code, m.start()) {
                        continue;
                    }
                    total += 1;
                    if allowed {
                        continue;
                    }
                    let field = &caps[1];
                    let action = match (caps.get(3), caps.get(4)) {
                        (Some(op), _) => format!("assigns with {}", op.as_str()),
                        (_, Some(method)) => format!("calls {}()", method.as_str()),
                        _ => "mutates".to_string(),
                    };
                    *by_field.entry(field.to_string()).or_default() += 1;
                    *by_layer.entry(file.layer.as_str()).or_default() += 1;
                    out.push(
                        Issue::new(
                            self.id(),
                            &file.rel_path,
                            idx + 1,
                            "state_mutation_outside_sim",
                            format!("{} layer {} state.{}{}", file.layer, action, field, &caps[2]),
                            Severity::Error,
                        )
                        .with_suggestion("route the change through a sim/ command or intent"),
                    );
                }
            }
        }

        out.set("fields", fields);
        out.set("mutations", total);
        out.set("violations", out.issues.len());
        out.set("by_field", serde_json::to_value(by_field)?);
        out.set("by_layer", serde_json::to_value(by_layer)?);
        Ok(out)
    }
}
