//! Project tree discovery.
//!
//! Yields `.gd`, `.tscn` and `.json` files in lexicographic order of their
//! project-relative path. Leading-dot directories (editor caches such as
//! `.godot` and `.import`, VCS metadata) are never entered. Files under the
//! configured skip dirs (the `addons` plugin directory by default) and
//! excluded paths are not analyzed but still count as existing resources.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::source::relative_path;
use crate::config::Config;

/// File kinds the walker collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Script,
    Scene,
    Data,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gd") => Some(FileKind::Script),
            Some("tscn") => Some(FileKind::Scene),
            Some("json") => Some(FileKind::Data),
            _ => None,
        }
    }
}

/// Result of walking a project root.
#[derive(Debug, Default)]
pub struct Discovered {
    pub scripts: Vec<PathBuf>,
    pub scenes: Vec<PathBuf>,
    pub data: Vec<PathBuf>,
    /// Every file outside leading-dot directories, relative, for resource
    /// existence checks. Includes skipped and excluded files.
    pub all_files: Vec<String>,
    /// Walk errors as (relative path, message).
    pub errors: Vec<(String, String)>,
}

/// Check if a directory name is skipped.
pub fn is_skipped_dir(name: &str, config: &Config) -> bool {
    name.starts_with('.') || config.skip_dirs.iter().any(|d| d == name)
}

/// Check if any segment of a relative path lies in a skipped directory.
pub fn is_skipped_path(rel_path: &str, config: &Config) -> bool {
    let mut segments: Vec<&str> = rel_path.split('/').collect();
    segments.pop();
    segments.iter().any(|s| is_skipped_dir(s, config))
}

/// Walk `root` and collect the files the analyzers consume.
pub fn discover(root: &Path, config: &Config) -> Discovered {
    let mut found = Discovered::default();
    let mut entries: Vec<(String, PathBuf)> = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if name.starts_with('.') {
                debug!(dir = %e.path().display(), "skipping directory");
                return false;
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let rel = e
                    .path()
                    .map(|p| relative_path(root, p))
                    .unwrap_or_default();
                warn!(path = %rel, error = %e, "walk error");
                found.errors.push((rel, e.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative_path(root, entry.path());
        entries.push((rel, entry.path().to_path_buf()));
    }

    // walkdir sorts per directory; a global sort on the relative string
    // gives the documented order regardless of separator handling.
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (rel, path) in entries {
        if is_skipped_path(&rel, config) || config.is_path_excluded(&rel) {
            found.all_files.push(rel);
            continue;
        }
        match FileKind::from_path(&path) {
            Some(FileKind::Script) => found.scripts.push(path),
            Some(FileKind::Scene) => found.scenes.push(path),
            Some(FileKind::Data) => found.data.push(path),
            None => {}
        }
        found.all_files.push(rel);
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, "").unwrap();
    }

    #[test]
    fn test_discover_skips_caches_and_plugins() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "sim/state.gd");
        touch(temp.path(), "ui/hud.gd");
        touch(temp.path(), "ui/hud.tscn");
        touch(temp.path(), "data/lessons.json");
        touch(temp.path(), ".godot/editor/cache.gd");
        touch(temp.path(), "addons/plugin/tool.gd");
        touch(temp.path(), "assets/icon.png");

        let found = discover(temp.path(), &Config::default());
        let scripts: Vec<String> = found
            .scripts
            .iter()
            .map(|p| relative_path(temp.path(), p))
            .collect();
        assert_eq!(scripts, vec!["sim/state.gd", "ui/hud.gd"]);
        assert_eq!(found.scenes.len(), 1);
        assert_eq!(found.data.len(), 1);
        assert!(found.all_files.contains(&"assets/icon.png".to_string()));
        assert!(!found.all_files.iter().any(|f| f.starts_with(".godot")));
    }

    #[test]
    fn test_skipped_and_excluded_files_still_exist() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "game/main.gd");
        touch(temp.path(), "addons/dialog/dialog.gd");
        touch(temp.path(), "addons/dialog/bubble.tscn");
        touch(temp.path(), "generated/table.gd");
        let config = Config {
            excluded_paths: vec!["generated/**".to_string()],
            ..Config::default()
        };

        let found = discover(temp.path(), &config);
        assert_eq!(found.scripts.len(), 1);
        assert!(found.scenes.is_empty());
        for rel in ["addons/dialog/dialog.gd", "addons/dialog/bubble.tscn", "generated/table.gd"] {
            assert!(found.all_files.contains(&rel.to_string()), "{} missing", rel);
        }
    }

    #[test]
    fn test_discover_is_sorted() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "b.gd");
        touch(temp.path(), "a/z.gd");
        touch(temp.path(), "a.gd");

        let found = discover(temp.path(), &Config::default());
        let scripts: Vec<String> = found
            .scripts
            .iter()
            .map(|p| relative_path(temp.path(), p))
            .collect();
        assert_eq!(scripts, vec!["a.gd", "a/z.gd", "b.gd"]);
    }

    #[test]
    fn test_is_skipped_path() {
        let config = Config::default();
        assert!(is_skipped_path(".godot/x.gd", &config));
        assert!(is_skipped_path("addons/gut/gut.gd", &config));
        assert!(!is_skipped_path("game/addons.gd", &config));
    }
}
