//! JSON data files: declared IDs, cross-file references and resource
//! strings.
//!
//! Line numbers are recovered by searching the raw text for the quoted
//! value, since the JSON parser does not keep positions; the first
//! occurrence wins.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::config::JsonConfig;
use crate::project::source::RES_PREFIX;

/// Top-level keys that never name an entry.
pub const RESERVED_KEYS: &[&str] = &["version", "meta", "settings", "config", "schema"];

/// Top-level arrays whose object elements carry an `id`.
pub const ID_ARRAYS: &[&str] = &[
    "lessons",
    "upgrades",
    "towers",
    "enemies",
    "buildings",
    "items",
    "achievements",
    "waves",
    "levels",
    "skills",
    "quests",
    "abilities",
    "units",
    "research",
    "events",
];

/// Fields whose string (or string array) values name another entry.
pub const REFERENCE_FIELDS: &[&str] = &[
    "requires",
    "prerequisite",
    "prerequisites",
    "unlocks",
    "upgrades_to",
    "next",
    "prev",
    "lesson_id",
    "tower_id",
    "enemy_id",
    "item_id",
    "upgrade_id",
    "unlocked_by",
    "depends_on",
];

/// IDs never reported as orphans.
pub const ENTRY_POINTS: &[&str] = &["start", "intro", "tutorial", "main", "default", "root", "first"];

/// How a file declares its IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSource {
    Entries,
    Arrays,
    TopLevelKeys,
    None,
}

/// A cross-file reference from a data file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DataRef {
    pub file: String,
    pub line: usize,
    pub field: String,
    /// JSON path of the value, e.g. `lessons[2].requires[0]`.
    pub path: String,
    pub target: String,
}

/// A `res://` string inside a data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataResource {
    pub line: usize,
    pub path: String,
    pub json_path: String,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataFile {
    pub rel_path: String,
    #[serde(skip)]
    pub value: Option<Value>,
    /// Parse error message when the file is not valid JSON.
    pub error: Option<String>,
    pub id_source: IdSource,
    /// Declared IDs with their line.
    pub ids: BTreeMap<String, usize>,
    pub references: Vec<DataRef>,
    pub resources: Vec<DataResource>,
}

impl DataFile {
    pub fn parse(rel_path: &str, text: &str, files: &BTreeSet<String>, config: &JsonConfig) -> Self {
        let mut data = DataFile {
            rel_path: rel_path.to_string(),
            value: None,
            error: None,
            id_source: IdSource::None,
            ids: BTreeMap::new(),
            references: Vec::new(),
            resources: Vec::new(),
        };

        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                data.error = Some(e.to_string());
                return data;
            }
        };

        let lines: Vec<&str> = text.lines().collect();
        let id_arrays: Vec<&str> = ID_ARRAYS
            .iter()
            .copied()
            .chain(config.id_arrays.iter().map(String::as_str))
            .collect();
        let reference_fields: BTreeSet<&str> = REFERENCE_FIELDS
            .iter()
            .copied()
            .chain(config.reference_fields.iter().map(String::as_str))
            .collect();

        data.collect_ids(&value, &lines, &id_arrays);

        let mut walker = Walker {
            file: rel_path,
            lines: &lines,
            reference_fields: &reference_fields,
            files,
            references: Vec::new(),
            resources: Vec::new(),
        };
        walker.walk(&value, "", None);
        data.references = walker.references;
        data.resources = walker.resources;
        data.value = Some(value);
        data
    }

    fn collect_ids(&mut self, value: &Value, lines: &[&str], id_arrays: &[&str]) {
        match value {
            Value::Object(map) => {
                if let Some(Value::Object(entries)) = map.get("entries") {
                    self.id_source = IdSource::Entries;
                    for key in entries.keys() {
                        self.ids.insert(key.clone(), find_key_line(lines, key));
                    }
                    return;
                }
                let mut found_array = false;
                for name in id_arrays {
                    if let Some(Value::Array(items)) = map.get(*name) {
                        found_array = true;
                        self.add_array_ids(items, lines);
                    }
                }
                if found_array {
                    self.id_source = IdSource::Arrays;
                    return;
                }
                self.id_source = IdSource::TopLevelKeys;
                for key in map.keys() {
                    if !RESERVED_KEYS.contains(&key.as_str()) {
                        self.ids.insert(key.clone(), find_key_line(lines, key));
                    }
                }
            }
            Value::Array(items) => {
                self.add_array_ids(items, lines);
                if !self.ids.is_empty() {
                    self.id_source = IdSource::Arrays;
                }
            }
            _ => {}
        }
    }

    fn add_array_ids(&mut self, items: &[Value], lines: &[&str]) {
        for item in items {
            if let Some(Value::String(id)) = item.get("id") {
                self.ids.insert(id.clone(), find_value_line(lines, id));
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

struct Walker<'a> {
    file: &'a str,
    lines: &'a [&'a str],
    reference_fields: &'a BTreeSet<&'a str>,
    files: &'a BTreeSet<String>,
    references: Vec<DataRef>,
    resources: Vec<DataResource>,
}

impl Walker<'_> {
    fn walk(&mut self, value: &Value, path: &str, field: Option<&str>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    let as_field = self.reference_fields.contains(key.as_str()).then_some(key.as_str());
                    self.walk(child, &child_path, as_field);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    self.walk(child, &format!("{}[{}]", path, i), field);
                }
            }
            Value::String(s) => {
                if let Some(rest) = s.strip_prefix(RES_PREFIX) {
                    self.resources.push(DataResource {
                        line: find_value_line(self.lines, s),
                        path: s.clone(),
                        json_path: path.to_string(),
                        exists: self.files.contains(rest),
                    });
                } else if let Some(field) = field {
                    if !s.is_empty() {
                        self.references.push(DataRef {
                            file: self.file.to_string(),
                            line: find_value_line(self.lines, s),
                            field: field.to_string(),
                            path: path.to_string(),
                            target: s.clone(),
                        });
                    }
                }
            }
            _ => {}
        }
    }
}

fn find_value_line(lines: &[&str], value: &str) -> usize {
    let needle = format!("\"{}\"", value);
    lines
        .iter()
        .position(|l| l.contains(&needle))
        .map(|i| i + 1)
        .unwrap_or(1)
}

fn find_key_line(lines: &[&str], key: &str) -> usize {
    let needle = format!("\"{}\"", key);
    lines
        .iter()
        .position(|l| {
            l.find(&needle)
                .map(|i| l[i + needle.len()..].trim_start().starts_with(':'))
                .unwrap_or(false)
        })
        .map(|i| i + 1)
        .unwrap_or(1)
}
