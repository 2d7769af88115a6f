//! Project model: discovered files, parsed inputs and the shared index.
//!
//! Loading never aborts on a bad file. Unreadable scripts, malformed JSON
//! and malformed `project.godot` lines become [`InputError`]s that the
//! runner surfaces as line-0 issues for every check consuming that input.

pub mod godot;
pub mod source;
pub mod walker;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

pub use godot::{AutoloadDecl, ProjectSettings, PROJECT_FILE};
pub use source::{Layer, SourceFile};

use crate::config::Config;
use crate::data::DataFile;
use crate::error::ScanError;
use crate::index::Index;
use crate::lex::FileFacts;
use crate::scene::SceneFile;

/// Which input an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InputKind {
    Script,
    Scene,
    Data,
    ProjectFile,
}

/// An input problem demoted to data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputError {
    pub input: InputKind,
    pub file: String,
    /// Machine tag from [`ScanError::kind`].
    pub kind: &'static str,
    pub message: String,
}

impl InputError {
    fn new(input: InputKind, file: &str, err: &ScanError) -> Self {
        Self {
            input,
            file: file.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// A loaded project.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
    pub settings: Option<ProjectSettings>,
    /// Scripts in lexicographic order of relative path.
    pub scripts: Vec<SourceFile>,
    /// Lexical facts, parallel to `scripts`.
    pub facts: Vec<FileFacts>,
    pub scenes: Vec<SceneFile>,
    pub data: Vec<DataFile>,
    /// Every file on disk outside leading-dot directories, relative,
    /// including skipped and excluded ones.
    pub all_files: BTreeSet<String>,
    pub input_errors: Vec<InputError>,
    pub index: Index,
}

impl Project {
    /// Walk, read, extract and index a project tree.
    pub fn load(root: &Path, config: Config) -> Result<Self, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::MissingRoot(root.to_path_buf()));
        }

        let found = walker::discover(root, &config);
        let mut input_errors = Vec::new();
        for (rel, message) in &found.errors {
            input_errors.push(InputError {
                input: InputKind::Script,
                file: rel.clone(),
                kind: "unreadable_file",
                message: message.clone(),
            });
        }

        let read: Vec<Result<SourceFile, (String, ScanError)>> = found
            .scripts
            .par_iter()
            .map(|path| {
                SourceFile::read(root, path).map_err(|e| (source::relative_path(root, path), e))
            })
            .collect();

        let mut scripts = Vec::with_capacity(read.len());
        for result in read {
            match result {
                Ok(file) => scripts.push(file),
                Err((rel, e)) => {
                    warn!(path = %rel, error = %e, "unreadable script");
                    input_errors.push(InputError::new(InputKind::Script, &rel, &e));
                }
            }
        }

        let mut texts = Vec::new();
        for path in found.scenes.iter().chain(found.data.iter()) {
            let rel = source::relative_path(root, path);
            match source::read_text(path) {
                Ok(text) => texts.push((rel, text)),
                Err(e) => {
                    warn!(path = %rel, error = %e, "unreadable file");
                    let input = if rel.ends_with(".tscn") {
                        InputKind::Scene
                    } else {
                        InputKind::Data
                    };
                    input_errors.push(InputError::new(input, &rel, &e));
                }
            }
        }

        let project_file = root.join(PROJECT_FILE);
        if project_file.is_file() {
            match source::read_text(&project_file) {
                Ok(text) => texts.push((PROJECT_FILE.to_string(), text)),
                Err(e) => input_errors.push(InputError::new(InputKind::ProjectFile, PROJECT_FILE, &e)),
            }
        }

        let all_files: BTreeSet<String> = found.all_files.into_iter().collect();
        let project = Self::assemble(root.to_path_buf(), config, scripts, texts, all_files, input_errors);
        info!(
            root = %root.display(),
            scripts = project.scripts.len(),
            scenes = project.scenes.len(),
            data = project.data.len(),
            "project loaded"
        );
        Ok(project)
    }

    /// Build a project from in-memory files keyed by relative path. Files
    /// are dispatched by extension; `project.godot` is read as settings.
    pub fn from_files(config: Config, files: &[(&str, &str)]) -> Self {
        let mut sorted: Vec<(&str, &str)> = files.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let all_files: BTreeSet<String> = sorted.iter().map(|(p, _)| p.to_string()).collect();
        let scripts = sorted
            .iter()
            .filter(|(p, _)| p.ends_with(".gd"))
            .map(|(p, t)| SourceFile::from_text(p, t))
            .collect();
        let texts = sorted
            .iter()
            .filter(|(p, _)| p.ends_with(".tscn") || p.ends_with(".json") || *p == PROJECT_FILE)
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect();

        Self::assemble(PathBuf::from("."), config, scripts, texts, all_files, Vec::new())
    }

    fn assemble(
        root: PathBuf,
        config: Config,
        scripts: Vec<SourceFile>,
        texts: Vec<(String, String)>,
        all_files: BTreeSet<String>,
        mut input_errors: Vec<InputError>,
    ) -> Self {
        let facts: Vec<FileFacts> = scripts.par_iter().map(FileFacts::extract).collect();

        let mut scenes = Vec::new();
        let mut data = Vec::new();
        let mut settings = None;

        for (rel, text) in &texts {
            if rel == PROJECT_FILE {
                let parsed = ProjectSettings::parse(text);
                for e in &parsed.errors {
                    input_errors.push(InputError::new(InputKind::ProjectFile, PROJECT_FILE, e));
                }
                settings = Some(parsed);
            } else if rel.ends_with(".tscn") {
                scenes.push(SceneFile::parse(rel, text, &all_files));
            } else {
                let parsed = DataFile::parse(rel, text, &all_files, &config.json);
                if let Some(message) = &parsed.error {
                    let err = ScanError::Json {
                        path: rel.clone(),
                        message: message.clone(),
                    };
                    debug!(path = %rel, "malformed JSON");
                    input_errors.push(InputError::new(InputKind::Data, rel, &err));
                }
                data.push(parsed);
            }
        }

        scenes.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        data.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        input_errors.sort_by(|a, b| (a.input, &a.file, &a.message).cmp(&(b.input, &b.file, &b.message)));

        let index = Index::build(&scripts, &facts, &scenes, &data, settings.as_ref(), &all_files);

        Self {
            root,
            config,
            settings,
            scripts,
            facts,
            scenes,
            data,
            all_files,
            input_errors,
            index,
        }
    }

    /// Script and facts by relative path.
    pub fn script(&self, rel_path: &str) -> Option<(&SourceFile, &FileFacts)> {
        let idx = self
            .scripts
            .binary_search_by(|s| s.rel_path.as_str().cmp(rel_path))
            .ok()?;
        Some((&self.scripts[idx], &self.facts[idx]))
    }

    /// Scripts paired with their facts, in order.
    pub fn sources(&self) -> impl Iterator<Item = (&SourceFile, &FileFacts)> {
        self.scripts.iter().zip(self.facts.iter())
    }

    pub fn has_file(&self, rel_path: &str) -> bool {
        self.all_files.contains(rel_path)
    }

    /// Normalise a user-supplied path to a project-relative one.
    pub fn relativize(&self, path: &str) -> String {
        let p = Path::new(path);
        let rel = if p.is_absolute() {
            source::relative_path(&self.root, p)
        } else {
            path.replace('\\', "/")
        };
        rel.trim_start_matches("./")
            .trim_start_matches(source::RES_PREFIX)
            .to_string()
    }
}

/// Nearest ancestor of `start` containing `project.godot`.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_FILE).is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_reports_bad_inputs_and_continues() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("data")).unwrap();
        std::fs::write(temp.path().join("main.gd"), "extends Node\n").unwrap();
        std::fs::write(temp.path().join("data/bad.json"), "{ nope").unwrap();
        std::fs::write(temp.path().join("project.godot"), "[autoload]\nbroken line\n").unwrap();

        let project = Project::load(temp.path(), Config::default()).unwrap();
        assert_eq!(project.scripts.len(), 1);
        assert_eq!(project.data.len(), 1);
        let kinds: Vec<&str> = project.input_errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec!["malformed_json", "malformed_project_file"]);
    }

    #[test]
    fn test_missing_root() {
        let err = Project::load(Path::new("/definitely/not/here"), Config::default()).unwrap_err();
        assert_eq!(err.kind(), "missing_root");
    }

    #[test]
    fn test_from_files_orders_scripts() {
        let project = Project::from_files(
            Config::default(),
            &[("ui/hud.gd", "extends Control\n"), ("sim/state.gd", "extends RefCounted\n")],
        );
        let paths: Vec<&str> = project.scripts.iter().map(|s| s.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["sim/state.gd", "ui/hud.gd"]);
        assert!(project.script("ui/hud.gd").is_some());
        assert!(project.script("ui/missing.gd").is_none());
    }

    #[test]
    fn test_find_root() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("scripts/tools")).unwrap();
        std::fs::write(temp.path().join("project.godot"), "").unwrap();
        let found = find_root(&temp.path().join("scripts/tools")).unwrap();
        assert_eq!(found, temp.path());
    }
}
