//! Signal wiring: declared signals nobody emits or connects, and emits of
//! signals declared nowhere.

use serde_json::json;

use super::{Category, Check, CheckContext, CheckOutput, Input, Issue, Severity, Threshold};
use crate::index::Resolution;
use crate::lex::RefKind;

pub struct Signals;

impl Check for Signals {
    fn id(&self) -> &'static str {
        "signals"
    }

    fn name(&self) -> &'static str {
        "Signal wiring"
    }

    fn category(&self) -> Category {
        Category::Godot
    }

    fn inputs(&self) -> &'static [Input] {
        &[Input::Scripts, Input::Scenes]
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.unused")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let index = &ctx.project.index;
        let mut unused = 0usize;
        let mut never_emitted = 0usize;

        for signal in &index.signals {
            if signal.is_unused() {
                unused += 1;
                out.push(
                    Issue::new(
                        self.id(),
                        &signal.file,
                        signal.line,
                        "unused_signal",
                        format!("signal '{}' is never emitted or connected", signal.name),
                        Severity::Warning,
                    )
                    .with_suggestion("remove the signal or wire it up"),
                );
            } else if signal.emits.is_empty() {
                never_emitted += 1;
                out.push(Issue::new(
                    self.id(),
                    &signal.file,
                    signal.line,
                    "signal_never_emitted",
                    format!(
                        "signal '{}' has {} connection(s) but is never emitted",
                        signal.name,
                        signal.connects.len()
                    ),
                    Severity::Info,
                ));
            }
        }

        let mut undeclared = 0usize;
        for r in index.references_of(RefKind::SignalEmit) {
            if r.resolution != Resolution::Unresolved {
                continue;
            }
            undeclared += 1;
            out.push(Issue::new(
                self.id(),
                &r.reference.file,
                r.reference.line,
                "undeclared_signal",
                format!("emits '{}' but no script declares that signal", r.reference.target),
                Severity::Warning,
            ));
        }

        let signals: Vec<_> = index
            .signals
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "file": s.file,
                    "line": s.line,
                    "emits": s.emits.len(),
                    "connects": s.connects.len(),
                })
            })
            .collect();

        out.set("declared", index.signals.len());
        out.set("unused", unused);
        out.set("never_emitted", never_emitted);
        out.set("undeclared_emits", undeclared);
        out.set("signals", signals);
        Ok(out)
    }
}
