//! Dictionary keys that look like typos of a common key.

use std::collections::BTreeSet;

use super::{Category, Check, CheckContext, CheckOutput, Issue, Severity, Threshold};

/// A key used this often is taken as the intended spelling.
pub const COMMON_USES: usize = 3;

/// True when `a` becomes `b` with one insertion, deletion, substitution or
/// adjacent transposition.
pub fn one_edit_apart(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a == b {
        return false;
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    match long.len() - short.len() {
        0 => {
            let diffs: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();
            match diffs.as_slice() {
                [_] => true,
                [i, j] => *j == i + 1 && a[*i] == b[*j] && a[*j] == b[*i],
                _ => false,
            }
        }
        1 => {
            let prefix = short.iter().zip(long.iter()).take_while(|(x, y)| x == y).count();
            short[prefix..] == long[prefix + 1..]
        }
        _ => false,
    }
}

pub struct DictKeys;

impl Check for DictKeys {
    fn id(&self) -> &'static str {
        "dict_keys"
    }

    fn name(&self) -> &'static str {
        "Dictionary key typos"
    }

    fn category(&self) -> Category {
        Category::DataIntegrity
    }

    fn threshold(&self) -> Threshold {
        Threshold::warn_only("summary.suspicious")
    }

    fn run(&self, ctx: &CheckContext<'_>) -> anyhow::Result<CheckOutput> {
        let mut out = CheckOutput::new();
        let keys = &ctx.project.index.dict_keys;
        let common: Vec<(&str, usize)> = keys
            .iter()
            .filter(|(_, sites)| sites.len() >= COMMON_USES)
            .map(|(k, sites)| (k.as_str(), sites.len()))
            .collect();
        let mut suspicious = BTreeSet::new();

        for (key, sites) in keys {
            let [site] = sites.as_slice() else { continue };
            // Nearest common key by use count, then alphabetically.
            let Some((target, uses)) = common
                .iter()
                .filter(|(c, _)| one_edit_apart(key, c))
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            else {
                continue;
            };
            suspicious.insert(key.as_str());
            out.push(
                Issue::new(
                    self.id(),
                    &site.file,
                    site.line,
                    "possible_key_typo",
                    format!("key \"{}\" is used once; \"{}\" is used {} times", key, target, uses),
                    Severity::Info,
                )
                .with_suggestion(format!("\"{}\"", target)),
            );
        }

        out.set("keys", keys.len());
        out.set("common_keys", common.len());
        out.set("suspicious", suspicious.len());
        Ok(out)
    }
}
