//! Removes class-level `const NAME = preload("…")` lines whose name is
//! never used elsewhere in the file.

use lazy_static::lazy_static;
use regex::Regex;

use super::Fixer;
use crate::config::Config;
use crate::lex::{code_part, contains_word, mask_strings};

lazy_static! {
    static ref PRELOAD_CONST: Regex = Regex::new(
        r#"^const\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*[A-Za-z_][A-Za-z0-9_]*)?\s*:?=\s*preload\s*\(\s*("[^"]*"|'[^']*')\s*\)\s*$"#
    )
    .unwrap();
}

/// Names and line indexes of single-line preload constants never used
/// outside their own declaration.
pub fn unused_preloads(lines: &[String]) -> Vec<(usize, String)> {
    let masked: Vec<String> = lines.iter().map(|l| mask_strings(code_part(l))).collect();
    let mut unused = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let code = code_part(line).trim_end();
        let Some(caps) = PRELOAD_CONST.captures(code) else { continue };
        let name = &caps[1];
        let used = masked
            .iter()
            .enumerate()
            .any(|(other, text)| other != idx && contains_word(text, name));
        if !used {
            unused.push((idx, name.to_string()));
        }
    }
    unused
}

pub struct UnusedPreloadFixer;

impl Fixer for UnusedPreloadFixer {
    fn id(&self) -> &'static str {
        "unused-preloads"
    }

    fn fix_lines(&self, lines: &[String], _config: &Config) -> Vec<Option<String>> {
        let mut out: Vec<Option<String>> = lines.iter().cloned().map(Some).collect();
        for (idx, _) in unused_preloads(lines) {
            out[idx] = None;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::fix_text;

    const SRC: &str = "extends Node\n\
const Tower = preload(\"res://sim/tower.gd\")\n\
const Enemy := preload(\"res://sim/enemy.gd\")\n\
const Ghost = preload(\"res://sim/ghost.gd\") # old\n\
\n\
func spawn():\n\
\tvar label = \"Ghost\"\n\
\treturn Tower.new()\n";

    #[test]
    fn test_finds_unused() {
        let lines: Vec<String> = SRC.lines().map(String::from).collect();
        let names: Vec<String> = unused_preloads(&lines).into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["Enemy", "Ghost"]);
    }

    #[test]
    fn test_removal_is_idempotent() {
        let config = Config::default();
        let once = fix_text(&UnusedPreloadFixer, "a.gd", SRC, &config);
        assert_eq!(once.changes.len(), 2);
        assert!(once.changes.iter().all(|c| c.after.is_none()));
        assert!(once.fixed.ends_with("return Tower.new()\n"));
        assert!(!once.fixed.contains("Enemy"));
        let twice = fix_text(&UnusedPreloadFixer, "a.gd", &once.fixed, &config);
        assert!(!twice.changed());
    }
}
