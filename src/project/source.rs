//! Source readers: decoded text, line arrays and layer tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ScanError;

/// Prefix of engine resource paths.
pub const RES_PREFIX: &str = "res://";

/// Architectural tier derived from the leading path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Sim,
    Game,
    Ui,
    Scripts,
    Tests,
    Tools,
    Other,
}

impl Layer {
    /// Layer of a project-relative path.
    pub fn from_rel_path(rel_path: &str) -> Self {
        let first = rel_path.split('/').next().unwrap_or("");
        Self::parse(first).unwrap_or(Layer::Other)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sim" => Some(Layer::Sim),
            "game" => Some(Layer::Game),
            "ui" => Some(Layer::Ui),
            "scripts" => Some(Layer::Scripts),
            "tests" => Some(Layer::Tests),
            "tools" => Some(Layer::Tools),
            "other" => Some(Layer::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Sim => "sim",
            Layer::Game => "game",
            Layer::Ui => "ui",
            Layer::Scripts => "scripts",
            Layer::Tests => "tests",
            Layer::Tools => "tools",
            Layer::Other => "other",
        }
    }

    /// Position in the dependency ordering. Lower layers must not depend on
    /// higher ones. `Other` is outside the ordering.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Layer::Sim => Some(0),
            Layer::Game => Some(1),
            Layer::Ui | Layer::Scripts => Some(2),
            Layer::Tools | Layer::Tests => Some(3),
            Layer::Other => None,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One `.gd` script.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path (or the relative path for in-memory sources).
    pub path: PathBuf,
    /// Path relative to the project root, `/`-separated.
    pub rel_path: String,
    pub layer: Layer,
    pub text: String,
    /// Lines without trailing newlines.
    pub lines: Vec<String>,
    /// Size in bytes as read from disk.
    pub size: usize,
}

impl SourceFile {
    /// Read a script from disk. Invalid UTF-8 is replaced, not rejected.
    pub fn read(root: &Path, path: &Path) -> Result<Self, ScanError> {
        let bytes = std::fs::read(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let size = bytes.len();
        let text = decode(&bytes);
        let rel_path = relative_path(root, path);
        let mut file = Self::from_text(&rel_path, &text);
        file.path = path.to_path_buf();
        file.size = size;
        Ok(file)
    }

    /// Build a source from text already in memory.
    pub fn from_text(rel_path: &str, text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text).to_string();
        let lines = text.lines().map(str::to_string).collect();
        Self {
            path: PathBuf::from(rel_path),
            rel_path: rel_path.to_string(),
            layer: Layer::from_rel_path(rel_path),
            size: text.len(),
            text,
            lines,
        }
    }

    /// 1-based line lookup. Out-of-range lines are empty.
    pub fn line(&self, line: usize) -> &str {
        if line == 0 {
            return "";
        }
        self.lines.get(line - 1).map(String::as_str).unwrap_or("")
    }

    /// Engine path of this file.
    pub fn res_path(&self) -> String {
        format!("{}{}", RES_PREFIX, self.rel_path)
    }

    /// File name without the extension.
    pub fn stem(&self) -> &str {
        let name = self.rel_path.rsplit('/').next().unwrap_or(&self.rel_path);
        name.strip_suffix(".gd").unwrap_or(name)
    }

    pub fn is_test(&self) -> bool {
        self.layer == Layer::Tests
            || self.rel_path.split('/').any(|s| s == "tests" || s == "test")
            || self.stem().starts_with("test_")
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences.
pub fn decode(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

/// Read any text file with replacement decoding.
pub fn read_text(path: &Path) -> Result<String, ScanError> {
    std::fs::read(path)
        .map(|b| decode(&b))
        .map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Project-relative, `/`-separated path.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Resolve a resource reference made from `from_rel` to a project-relative
/// path. `res://` paths are absolute; bare paths are relative to the
/// referencing file's directory. Returns `None` for `user://` and other
/// schemes.
pub fn resolve_resource(from_rel: &str, target: &str) -> Option<String> {
    if let Some(rest) = target.strip_prefix(RES_PREFIX) {
        return Some(normalize(rest));
    }
    if target.contains("://") || target.starts_with("uid:") {
        return None;
    }
    let dir = match from_rel.rfind('/') {
        Some(idx) => &from_rel[..idx],
        None => "",
    };
    if dir.is_empty() {
        Some(normalize(target))
    } else {
        Some(normalize(&format!("{}/{}", dir, target)))
    }
}

/// Collapse `.` and `..` segments.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_from_path() {
        assert_eq!(Layer::from_rel_path("sim/game_state.gd"), Layer::Sim);
        assert_eq!(Layer::from_rel_path("ui/widgets/button.gd"), Layer::Ui);
        assert_eq!(Layer::from_rel_path("main.gd"), Layer::Other);
        assert_eq!(Layer::from_rel_path("simulation/x.gd"), Layer::Other);
    }

    #[test]
    fn test_layer_ranks() {
        assert!(Layer::Sim.rank() < Layer::Game.rank());
        assert_eq!(Layer::Ui.rank(), Layer::Scripts.rank());
        assert_eq!(Layer::Tools.rank(), Layer::Tests.rank());
        assert_eq!(Layer::Other.rank(), None);
    }

    #[test]
    fn test_from_text_lines() {
        let f = SourceFile::from_text("game/a.gd", "\u{feff}extends Node\r\nvar x = 1\n");
        assert_eq!(f.lines, vec!["extends Node", "var x = 1"]);
        assert_eq!(f.line(1), "extends Node");
        assert_eq!(f.line(0), "");
        assert_eq!(f.line(9), "");
        assert_eq!(f.stem(), "a");
        assert_eq!(f.res_path(), "res://game/a.gd");
    }

    #[test]
    fn test_decode_replaces_invalid_bytes() {
        let text = decode(&[b'a', 0xff, b'b']);
        assert_eq!(text, "a\u{fffd}b");
    }

    #[test]
    fn test_resolve_resource() {
        assert_eq!(
            resolve_resource("ui/hud.gd", "res://sim/game_state.gd"),
            Some("sim/game_state.gd".to_string())
        );
        assert_eq!(
            resolve_resource("ui/hud.gd", "widgets/bar.gd"),
            Some("ui/widgets/bar.gd".to_string())
        );
        assert_eq!(
            resolve_resource("ui/hud.gd", "../sim/x.gd"),
            Some("sim/x.gd".to_string())
        );
        assert_eq!(resolve_resource("a.gd", "user://save.json"), None);
    }
}
