//! Rewrites `IDENT["KEY"]` reads to `IDENT.get("KEY", DEFAULT)`.

use phf::phf_set;

use super::Fixer;
use crate::checks::naming::split_words;
use crate::config::Config;
use crate::lex::{extract_dict_accesses, DictAccessForm};

static FALSE_PREFIXES: phf::Set<&'static str> = phf_set! {
    "is", "has", "can", "should", "was", "did", "allow", "use",
};

static ZERO_SUFFIXES: phf::Set<&'static str> = phf_set! {
    "count", "total", "index", "idx", "level", "amount", "score", "num",
    "number", "size", "cost", "price", "damage", "hp", "health", "gold",
    "speed", "rate", "duration", "delay", "width", "height", "tier", "wave",
};

static STRING_SUFFIXES: phf::Set<&'static str> = phf_set! {
    "name", "text", "id", "path", "title", "label", "type", "description",
    "key", "message", "word", "string", "str", "icon",
};

static ARRAY_SUFFIXES: phf::Set<&'static str> = phf_set! {
    "items", "list", "ids", "entries", "names", "tags", "children", "array",
    "keys", "values", "words", "rewards", "requires", "prerequisites",
};

static DICT_SUFFIXES: phf::Set<&'static str> = phf_set! {
    "data", "map", "dict", "config", "settings", "stats", "meta", "info",
    "props", "properties",
};

/// Default value for a missing key, chosen from its name.
pub fn smart_default(key: &str) -> &'static str {
    let words: Vec<String> = split_words(key).iter().map(|w| w.to_lowercase()).collect();
    let (Some(first), Some(last)) = (words.first(), words.last()) else {
        return "null";
    };
    if FALSE_PREFIXES.contains(first.as_str()) && words.len() > 1 {
        "false"
    } else if ZERO_SUFFIXES.contains(last.as_str()) {
        "0"
    } else if STRING_SUFFIXES.contains(last.as_str()) {
        "\"\""
    } else if ARRAY_SUFFIXES.contains(last.as_str()) {
        "[]"
    } else if DICT_SUFFIXES.contains(last.as_str()) {
        "{}"
    } else {
        "null"
    }
}

pub struct DictAccessFixer;

impl Fixer for DictAccessFixer {
    fn id(&self) -> &'static str {
        "dict-access"
    }

    fn fix_lines(&self, lines: &[String], _config: &Config) -> Vec<Option<String>> {
        let mut out: Vec<Option<String>> = lines.iter().cloned().map(Some).collect();

        let mut accesses = extract_dict_accesses(lines);
        // Right to left so earlier offsets stay valid.
        accesses.sort_by(|a, b| (a.line, b.column).cmp(&(b.line, a.column)));

        for access in accesses {
            if access.form != DictAccessForm::Bracket || access.is_assignment {
                continue;
            }
            let Some(Some(line)) = out.get_mut(access.line - 1) else { continue };
            // Chained subscripts are left alone.
            if line[access.end..].trim_start().starts_with('[') {
                continue;
            }
            let replacement = format!(
                "{}.get(\"{}\", {})",
                access.receiver,
                access.key,
                smart_default(&access.key)
            );
            line.replace_range(access.column..access.end, &replacement);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{dict_access, testutil};
    use crate::fix::fix_text;

    #[test]
    fn test_smart_defaults() {
        assert_eq!(smart_default("player_name"), "\"\"");
        assert_eq!(smart_default("count"), "0");
        assert_eq!(smart_default("enemy_count"), "0");
        assert_eq!(smart_default("is_boss"), "false");
        assert_eq!(smart_default("items"), "[]");
        assert_eq!(smart_default("data"), "{}");
        assert_eq!(smart_default("mystery"), "null");
    }

    #[test]
    fn test_rewrites_reads() {
        let config = Config::default();
        let text = "func f(config, data):\n\tvar name = config[\"player_name\"]\n\tif data[\"count\"] > 0:\n\t\tdata[\"count\"] = 1\n";
        let out = fix_text(&DictAccessFixer, "a.gd", text, &config);
        assert_eq!(
            out.fixed,
            "func f(config, data):\n\tvar name = config.get(\"player_name\", \"\")\n\tif data.get(\"count\", 0) > 0:\n\t\tdata[\"count\"] = 1\n"
        );
    }

    #[test]
    fn test_idempotent() {
        let config = Config::default();
        let text = "func f(a, b):\n\tprint(a[\"x\"], b['items'], a[\"is_on\"])\n\t# a[\"ignored\"]\n\tvar s = \"a['k']\"\n";
        let once = fix_text(&DictAccessFixer, "a.gd", text, &config);
        let twice = fix_text(&DictAccessFixer, "a.gd", &once.fixed, &config);
        assert!(once.changed());
        assert!(!twice.changed());
        assert_eq!(once.fixed, twice.fixed);
        assert!(once.fixed.contains("b.get(\"items\", [])"));
        assert!(once.fixed.contains("# a[\"ignored\"]"));
    }

    #[test]
    fn test_check_is_clean_after_fix() {
        let config = Config::default();
        let text = "func f(cfg, stats):\n\tvar hp = stats[\"hp\"]\n\tvar t = cfg[\"title\"] + cfg[\"subtitle\"]\n";
        let fixed = fix_text(&DictAccessFixer, "a.gd", text, &config).fixed;
        let out = testutil::run(&dict_access::DictAccess, &[("a.gd", &fixed)]);
        assert!(out.issues.is_empty());
    }
}
