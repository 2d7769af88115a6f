//! Debug output left in non-test scripts.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};
use crate::lex::{code_part, is_inside_string_literal};

lazy_static! {
    static ref PRINT: Regex = Regex::new(r"\b(print|prints|printt|print_debug|print_rich)\s*\(").unwrap();
    static ref PUSH: Regex = Regex::new(r"\b(push_error|push_warning)\s*\(").unwrap();
}

pub struct PrintStatements;

impl Check for PrintStatements {
    fn id(&self) -> &'static str {
        "print_statements"
    }

    fn name(&self) -> &'static str {
        "Print statements"
    }

    fn category(&self) -> Category {
        Category::Maintenance
    }

    fn quick(&self) -> bool {
        true
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.prints")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let mut by_function: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut prints = 0usize;
        let mut pushes = 0usize;
        let mut skipped_files = 0usize;

        for (file, _) in ctx.project.sources() {
            if file.is_test() {
                skipped_files += 1;
                continue;
            }
            for (idx, raw) in file.lines.iter().enumerate() {
                let code = code_part(raw);
                for caps in PRINT.captures_iter(code) {
                    let Some(m) = caps.get(1) else { continue };
                    if is_inside_string_literal(code, m.start()) {
                        continue;
                    }
                    let name = call_name(m.as_str());
                    prints += 1;
                    *by_function.entry(name).or_default() += 1;
                    out.push(
                        Issue::new(
                            self.id(),
                            &file.rel_path,
                            idx + 1,
                            "print_statement",
                            format!("{}() left in {}", name, file.rel_path),
                            Severity::Warning,
                        )
                        .with_suggestion("remove it or route through a logger"),
                    );
                }

                if !ctx.options.strict {
                    continue;
                }
                for caps in PUSH.captures_iter(code) {
                    let Some(m) = caps.get(1) else { continue };
                    if is_inside_string_literal(code, m.start()) {
                        continue;
                    }
                    let name = call_name(m.as_str());
                    pushes += 1;
                    *by_function.entry(name).or_default() += 1;
                    out.push(Issue::new(
                        self.id(),
                        &file.rel_path,
                        idx + 1,
                        "push_message",
                        format!("{}() reports to the debugger output", name),
                        Severity::Info,
                    ));
                }
            }
        }

        out.set("prints", prints);
        out.set("push_messages", pushes);
        out.set("skipped_test_files", skipped_files);
        out.set("by_function", serde_json::to_value(by_function)?);
        Ok(out)
    }
}

fn call_name(s: &str) -> &'static str {
    match s {
        "prints" => "prints",
        "printt" => "printt",
        "print_debug" => "print_debug",
        "print_rich" => "print_rich",
        "push_error" => "push_error",
        "push_warning" => "push_warning",
        _ => "print",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testutil;

    const SRC: &str = "func f():\n\tprint(\"hi\")\n\tprint_rich(\"[b]x[/b]\")\n\t# print(\"old\")\n\tvar s = \"print(x)\"\n\tpush_error(\"bad\")\n\tblueprint(1)\n";

    #[test]
    fn test_prints() {
        let out = testutil::run(&PrintStatements, &[("game/a.gd", SRC), ("tests/test_a.gd", SRC)]);
        let got: Vec<(&str, usize)> = out.issues.iter().map(|i| (i.file.as_str(), i.line)).collect();
        assert_eq!(got, vec![("game/a.gd", 2), ("game/a.gd", 3)]);
        assert_eq!(out.summary["by_function"]["print_rich"], 1);
        assert_eq!(out.summary["skipped_test_files"], 1);
    }

    #[test]
    fn test_strict_tracks_push() {
        let out = testutil::strict(&PrintStatements, &[("game/a.gd", SRC)]);
        assert_eq!(testutil::types(&out), vec!["print_statement", "print_statement", "push_message"]);
        assert_eq!(out.issues[2].severity, Severity::Info);
    }
}
