//! Reader for the engine's `project.godot` file.
//!
//! Only the `[autoload]` and `[input]` sections matter to the checks, but
//! every section is kept so callers can inspect other settings. Values
//! spanning several lines (input event dictionaries) are joined.

use std::collections::BTreeMap;

use crate::error::ScanError;

/// Name of the engine project file at the root.
pub const PROJECT_FILE: &str = "project.godot";

/// A singleton declared in `[autoload]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoloadDecl {
    pub name: String,
    /// Resource path with the enabled marker stripped.
    pub path: String,
    /// `*` prefix: instantiated as a global singleton.
    pub singleton: bool,
    pub line: usize,
}

/// Parsed project settings.
#[derive(Debug, Default)]
pub struct ProjectSettings {
    /// Autoloads in declaration order.
    pub autoloads: Vec<AutoloadDecl>,
    /// Input actions with their declaration line, in declaration order.
    pub input_actions: Vec<(String, usize)>,
    /// Raw key/value pairs per section. Keys before the first section live
    /// under the empty section name.
    pub sections: BTreeMap<String, BTreeMap<String, String>>,
    /// Lines that could not be parsed.
    pub errors: Vec<ScanError>,
}

impl ProjectSettings {
    pub fn parse(text: &str) -> Self {
        let mut settings = ProjectSettings::default();
        let mut section = String::new();
        let lines: Vec<&str> = text.lines().collect();
        let mut i = 0;

        while i < lines.len() {
            let line_number = i + 1;
            let raw = lines[i];
            let trimmed = raw.trim();
            i += 1;

            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                continue;
            }

            if trimmed.starts_with('[') {
                if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                    section = name.trim().to_string();
                    settings.sections.entry(section.clone()).or_default();
                } else {
                    settings.errors.push(ScanError::ProjectFile {
                        line: line_number,
                        message: format!("unterminated section header {:?}", trimmed),
                    });
                }
                continue;
            }

            let Some(eq) = trimmed.find('=') else {
                settings.errors.push(ScanError::ProjectFile {
                    line: line_number,
                    message: format!("expected key=value, found {:?}", trimmed),
                });
                continue;
            };

            let key = trimmed[..eq].trim().to_string();
            let mut value = trimmed[eq + 1..].trim().to_string();

            // Join continuation lines until brackets balance.
            let mut depth = bracket_depth(&value);
            while depth > 0 && i < lines.len() {
                value.push('\n');
                value.push_str(lines[i]);
                depth += bracket_depth(lines[i]);
                i += 1;
            }

            if key.is_empty() {
                settings.errors.push(ScanError::ProjectFile {
                    line: line_number,
                    message: "empty key".to_string(),
                });
                continue;
            }

            match section.as_str() {
                "autoload" => {
                    let unquoted = value.trim_matches('"');
                    let singleton = unquoted.starts_with('*');
                    settings.autoloads.push(AutoloadDecl {
                        name: key.clone(),
                        path: unquoted.trim_start_matches('*').to_string(),
                        singleton,
                        line: line_number,
                    });
                }
                "input" => settings.input_actions.push((key.clone(), line_number)),
                _ => {}
            }

            settings
                .sections
                .entry(section.clone())
                .or_default()
                .insert(key, value);
        }

        settings
    }

    /// Names of all declared input actions.
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.input_actions.iter().map(|(name, _)| name.as_str())
    }

    pub fn autoload(&self, name: &str) -> Option<&AutoloadDecl> {
        self.autoloads.iter().find(|a| a.name == name)
    }

    /// Value of a setting such as `application/config/name`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }
}

/// Net change in bracket depth across a line, ignoring quoted text.
fn bracket_depth(line: &str) -> i32 {
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    for ch in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' | '[' | '(' if !in_string => depth += 1,
            '}' | ']' | ')' if !in_string => depth -= 1,
            _ => {}
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"; Engine configuration file.
config_version=5

[application]

config/name="Keyboard Defense"

[autoload]

Audio="*res://audio.gd"
Settings="*res://settings.gd"
Main="res://main.gd"

[input]

jump={
"deadzone": 0.5,
"events": [Object(InputEventKey,"resource_local_to_scene":false,"keycode":32)
]
}
move_left={
"deadzone": 0.5,
"events": []
}
"#;

    #[test]
    fn test_parse_autoloads_in_order() {
        let settings = ProjectSettings::parse(SAMPLE);
        let names: Vec<&str> = settings.autoloads.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Audio", "Settings", "Main"]);
        assert_eq!(settings.autoloads[0].path, "res://audio.gd");
        assert!(settings.autoloads[0].singleton);
        assert!(!settings.autoloads[2].singleton);
        assert!(settings.errors.is_empty());
    }

    #[test]
    fn test_parse_multiline_input_actions() {
        let settings = ProjectSettings::parse(SAMPLE);
        let actions: Vec<&str> = settings.action_names().collect();
        assert_eq!(actions, vec!["jump", "move_left"]);
    }

    #[test]
    fn test_top_level_and_section_values() {
        let settings = ProjectSettings::parse(SAMPLE);
        assert_eq!(settings.get("", "config_version"), Some("5"));
        assert_eq!(
            settings.get("application", "config/name"),
            Some("\"Keyboard Defense\"")
        );
    }

    #[test]
    fn test_malformed_line_is_reported() {
        let settings = ProjectSettings::parse("[input]\nthis is not valid\n");
        assert_eq!(settings.errors.len(), 1);
        assert!(matches!(
            settings.errors[0],
            ScanError::ProjectFile { line: 2, .. }
        ));
    }
}
