//! The shared, read-only project index.
//!
//! Built once per run in a single ordered pass over scripts, scenes, data
//! files and `project.godot`, then consumed by every check. All maps are
//! ordered so iteration never depends on hashing.

pub mod builtins;
pub mod graph;

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

pub use graph::{topo_order, DepGraph, Edge};

use crate::data::DataFile;
use crate::lex::{code_part, mask_strings, DeclKind, FileFacts, RefKind, Reference};
use crate::project::godot::{ProjectSettings, PROJECT_FILE};
use crate::project::source::{resolve_resource, SourceFile};
use crate::scene::SceneFile;

lazy_static! {
    static ref IDENT: Regex = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap();
}

/// A location in the project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Site {
    pub file: String,
    pub line: usize,
}

impl Site {
    pub fn new(file: &str, line: usize) -> Self {
        Self {
            file: file.to_string(),
            line,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassEntry {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub base: Option<String>,
    pub methods: Vec<String>,
    pub signals: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalEntry {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub emits: Vec<Site>,
    pub connects: Vec<Site>,
}

impl SignalEntry {
    pub fn is_unused(&self) -> bool {
        self.emits.is_empty() && self.connects.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoloadEntry {
    pub name: String,
    /// Path as declared in `project.godot`.
    pub path: String,
    /// Project-relative script backing the singleton, if resolvable.
    pub script: Option<String>,
    pub exists: bool,
    pub singleton: bool,
    pub line: usize,
    /// Other autoloads named from this autoload's script.
    pub deps: BTreeSet<String>,
    /// `Name.member` sites outside the autoload's own script.
    pub usage_count: usize,
    pub users: BTreeSet<String>,
}

/// How a reference resolved against the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "target", rename_all = "snake_case")]
pub enum Resolution {
    /// Resolved to a file or table entry.
    Resolved(String),
    /// Nothing in the project or engine matches.
    Unresolved,
    /// Only knowable when the game runs (node paths, awaited expressions).
    Runtime,
    /// Provided by the engine.
    External,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRef {
    #[serde(flatten)]
    pub reference: Reference,
    pub resolution: Resolution,
}

/// An import whose target is not part of the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenImport {
    pub file: String,
    pub line: usize,
    pub target: String,
    pub kind: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct Index {
    /// `class_name` → first defining file (in path order).
    pub classes: BTreeMap<String, ClassEntry>,
    pub class_by_file: BTreeMap<String, String>,
    /// Class names declared by more than one file, with every site.
    pub duplicate_classes: BTreeMap<String, Vec<Site>>,
    pub signals: Vec<SignalEntry>,
    /// Autoloads in declaration order.
    pub autoloads: Vec<AutoloadEntry>,
    pub autoload_order: Vec<String>,
    /// False when a dependency cycle forced a fallback.
    pub autoload_order_complete: bool,
    pub input_actions: BTreeMap<String, usize>,
    /// Script-to-script import graph.
    pub imports: DepGraph,
    pub broken_imports: Vec<BrokenImport>,
    /// Function name → definition sites.
    pub functions: BTreeMap<String, Vec<Site>>,
    /// Dictionary key → access sites (all forms).
    pub dict_keys: BTreeMap<String, Vec<Site>>,
    /// Magic number value → sites.
    pub magic_numbers: BTreeMap<String, Vec<Site>>,
    /// Identifier → file → occurrence count in code (strings masked).
    pub identifiers: BTreeMap<String, BTreeMap<String, usize>>,
    /// Every string literal value in code.
    pub string_values: BTreeSet<String>,
    /// Methods named by scene `[connection]` entries.
    pub scene_methods: BTreeSet<String>,
    /// Script → scenes attaching it.
    pub scene_scripts: BTreeMap<String, Vec<String>>,
    /// Data ID → files declaring it.
    pub data_ids: BTreeMap<String, Vec<String>>,
    pub references: Vec<ResolvedRef>,
}

impl Index {
    pub fn build(
        scripts: &[SourceFile],
        facts: &[FileFacts],
        scenes: &[SceneFile],
        data: &[DataFile],
        settings: Option<&ProjectSettings>,
        all_files: &BTreeSet<String>,
    ) -> Self {
        let mut index = Index {
            autoload_order_complete: true,
            ..Default::default()
        };
        let script_set: BTreeSet<&str> = scripts.iter().map(|s| s.rel_path.as_str()).collect();

        // Declarations, identifiers and histograms.
        for (file, f) in scripts.iter().zip(facts) {
            index.add_script(file, f);
        }

        // Class-name links need the complete class map.
        for f in facts {
            index.add_imports(f, &script_set, all_files);
        }

        for scene in scenes {
            for conn in &scene.connections {
                if !conn.method.is_empty() {
                    index.scene_methods.insert(conn.method.clone());
                }
            }
            for script in scene.scripts() {
                index
                    .scene_scripts
                    .entry(script)
                    .or_default()
                    .push(scene.rel_path.clone());
            }
        }

        for d in data {
            for id in d.ids.keys() {
                index.data_ids.entry(id.clone()).or_default().push(d.rel_path.clone());
            }
        }

        if let Some(settings) = settings {
            for (name, line) in &settings.input_actions {
                index.input_actions.entry(name.clone()).or_insert(*line);
            }
            index.add_autoloads(settings, facts, scenes, all_files);
        }

        index.link_signals(facts, scenes);
        index.resolve_references(facts, all_files);
        index
    }

    fn add_script(&mut self, file: &SourceFile, facts: &FileFacts) {
        let rel = &file.rel_path;

        if let Some((name, line)) = &facts.class_name {
            let methods = facts
                .functions
                .iter()
                .filter(|f| f.indent == 0)
                .map(|f| f.name.clone())
                .collect();
            let signals = facts
                .declarations_of(DeclKind::Signal)
                .map(|d| d.name.clone())
                .collect();
            let entry = ClassEntry {
                name: name.clone(),
                file: rel.clone(),
                line: *line,
                base: facts.extends.as_ref().map(|e| e.target.clone()),
                methods,
                signals,
            };
            self.class_by_file.insert(rel.clone(), name.clone());
            match self.classes.get(name) {
                Some(existing) => {
                    let sites = self
                        .duplicate_classes
                        .entry(name.clone())
                        .or_insert_with(|| vec![Site::new(&existing.file, existing.line)]);
                    sites.push(Site::new(rel, *line));
                }
                None => {
                    self.classes.insert(name.clone(), entry);
                }
            }
        }

        for f in &facts.functions {
            self.functions
                .entry(f.name.clone())
                .or_default()
                .push(Site::new(rel, f.line));
        }

        for d in facts.declarations_of(DeclKind::Signal) {
            self.signals.push(SignalEntry {
                name: d.name.clone(),
                file: rel.clone(),
                line: d.line,
                emits: Vec::new(),
                connects: Vec::new(),
            });
        }

        for access in &facts.dict_accesses {
            self.dict_keys
                .entry(access.key.clone())
                .or_default()
                .push(Site::new(rel, access.line));
        }

        for n in &facts.numbers {
            self.magic_numbers
                .entry(n.value.clone())
                .or_default()
                .push(Site::new(rel, n.line));
        }

        for s in &facts.strings {
            self.string_values.insert(s.value.clone());
        }

        for line in &file.lines {
            let masked = mask_strings(code_part(line));
            for m in IDENT.find_iter(&masked) {
                *self
                    .identifiers
                    .entry(m.as_str().to_string())
                    .or_default()
                    .entry(rel.clone())
                    .or_default() += 1;
            }
        }
    }

    fn add_imports(&mut self, facts: &FileFacts, scripts: &BTreeSet<&str>, all_files: &BTreeSet<String>) {
        let rel = &facts.rel_path;
        self.imports.add_node(rel);

        for import in &facts.imports {
            let Some(target) = resolve_resource(rel, &import.target) else {
                continue;
            };
            if scripts.contains(target.as_str()) {
                if target != *rel {
                    self.imports.add_edge(rel, &target, import.kind, import.line);
                }
            } else if !all_files.contains(&target) {
                self.broken_imports.push(BrokenImport {
                    file: rel.clone(),
                    line: import.line,
                    target: import.target.clone(),
                    kind: import.kind.as_str(),
                });
            }
        }

        if let Some(ext) = facts.extends.as_ref().filter(|e| !e.is_path) {
            if let Some(class) = self.classes.get(&ext.target) {
                if class.file != *rel {
                    let to = class.file.clone();
                    self.imports.add_edge(rel, &to, crate::lex::ImportKind::Extends, ext.line);
                }
            }
        }
    }

    fn add_autoloads(
        &mut self,
        settings: &ProjectSettings,
        facts: &[FileFacts],
        scenes: &[SceneFile],
        all_files: &BTreeSet<String>,
    ) {
        let names: BTreeSet<&str> = settings.autoloads.iter().map(|a| a.name.as_str()).collect();

        for decl in &settings.autoloads {
            let target = resolve_resource("", &decl.path);
            let exists = target.as_ref().is_some_and(|t| all_files.contains(t));
            let script = match target {
                Some(t) if t.ends_with(".tscn") => scenes
                    .iter()
                    .find(|s| s.rel_path == t)
                    .and_then(|s| s.root())
                    .and_then(|root| root.script.as_deref())
                    .and_then(|s| resolve_resource(&t, s)),
                other => other,
            };

            let mut deps = BTreeSet::new();
            let mut usage_count = 0;
            let mut users = BTreeSet::new();
            for f in facts {
                let own = script.as_deref() == Some(f.rel_path.as_str());
                for r in f.references.iter().filter(|r| r.kind == RefKind::AutoloadMember) {
                    let qualifier = r.target.split('.').next().unwrap_or("");
                    if own {
                        if qualifier != decl.name && names.contains(qualifier) {
                            deps.insert(qualifier.to_string());
                        }
                    } else if qualifier == decl.name {
                        usage_count += 1;
                        users.insert(f.rel_path.clone());
                    }
                }
            }

            self.autoloads.push(AutoloadEntry {
                name: decl.name.clone(),
                path: decl.path.clone(),
                script,
                exists,
                singleton: decl.singleton,
                line: decl.line,
                deps,
                usage_count,
                users,
            });
        }

        let order: Vec<String> = self.autoloads.iter().map(|a| a.name.clone()).collect();
        let deps: BTreeMap<String, BTreeSet<String>> = self
            .autoloads
            .iter()
            .map(|a| (a.name.clone(), a.deps.clone()))
            .collect();
        let (load_order, complete) = topo_order(&order, &deps);
        self.autoload_order = load_order;
        self.autoload_order_complete = complete;
    }

    fn link_signals(&mut self, facts: &[FileFacts], scenes: &[SceneFile]) {
        let mut emits: BTreeMap<&str, Vec<Site>> = BTreeMap::new();
        let mut connects: BTreeMap<&str, Vec<Site>> = BTreeMap::new();

        for f in facts {
            for r in &f.references {
                match r.kind {
                    RefKind::SignalEmit => emits.entry(r.target.as_str()).or_default().push(Site::new(&r.file, r.line)),
                    RefKind::SignalConnect => connects.entry(r.target.as_str()).or_default().push(Site::new(&r.file, r.line)),
                    _ => {}
                }
            }
            for a in &f.awaits {
                if let Some(last) = a.expr.rsplit('.').next() {
                    connects.entry(last.trim()).or_default().push(Site::new(&f.rel_path, a.line));
                }
            }
        }
        for scene in scenes {
            for conn in &scene.connections {
                connects
                    .entry(conn.signal.as_str())
                    .or_default()
                    .push(Site::new(&scene.rel_path, conn.line));
            }
        }

        for entry in &mut self.signals {
            if let Some(sites) = emits.get(entry.name.as_str()) {
                entry.emits = sites.clone();
            }
            if let Some(sites) = connects.get(entry.name.as_str()) {
                entry.connects = sites.clone();
            }
        }
    }

    fn resolve_references(&mut self, facts: &[FileFacts], all_files: &BTreeSet<String>) {
        let mut resolved = Vec::new();

        for f in facts {
            let local: BTreeSet<&str> = f
                .declarations
                .iter()
                .filter(|d| {
                    matches!(d.kind, DeclKind::InnerClass | DeclKind::Enum | DeclKind::Constant)
                })
                .map(|d| d.name.as_str())
                .collect();

            for r in &f.references {
                let resolution = match r.kind {
                    RefKind::ResourcePath => match resolve_resource(&r.file, &r.target) {
                        Some(path) if all_files.contains(&path) => Resolution::Resolved(path),
                        Some(_) => Resolution::Unresolved,
                        None => Resolution::External,
                    },
                    RefKind::ClassName => self.resolve_name(&r.target, &f.rel_path, &local),
                    RefKind::AutoloadMember => {
                        let qualifier = r.target.split('.').next().unwrap_or("");
                        self.resolve_name(qualifier, &f.rel_path, &local)
                    }
                    RefKind::SignalEmit | RefKind::SignalConnect => {
                        match self.signals.iter().find(|s| s.name == r.target) {
                            Some(s) => Resolution::Resolved(s.file.clone()),
                            None if builtins::BUILTIN_SIGNALS.contains(r.target.as_str()) => {
                                Resolution::External
                            }
                            None => Resolution::Unresolved,
                        }
                    }
                    RefKind::InputAction => {
                        if self.input_actions.contains_key(&r.target) {
                            Resolution::Resolved(PROJECT_FILE.to_string())
                        } else if r.target.starts_with("ui_") {
                            Resolution::External
                        } else {
                            Resolution::Unresolved
                        }
                    }
                    _ => Resolution::Runtime,
                };
                resolved.push(ResolvedRef {
                    reference: r.clone(),
                    resolution,
                });
            }

            let mut push = |kind: RefKind, target: &str, line: usize, function: &Option<String>, resolution: Resolution| {
                resolved.push(ResolvedRef {
                    reference: Reference {
                        kind,
                        target: target.to_string(),
                        file: f.rel_path.clone(),
                        line,
                        function: function.clone(),
                    },
                    resolution,
                });
            };
            for n in &f.node_refs {
                push(RefKind::NodePath, &n.path, n.line, &n.function, Resolution::Runtime);
            }
            for a in &f.awaits {
                push(RefKind::AwaitTarget, &a.expr, a.line, &a.function, Resolution::Runtime);
            }
            for d in &f.dict_accesses {
                push(RefKind::DictKey, &d.key, d.line, &None, Resolution::Resolved(d.key.clone()));
            }
            for n in &f.numbers {
                push(RefKind::MagicNumber, &n.value, n.line, &n.function, Resolution::Resolved(n.value.clone()));
            }
        }

        resolved.sort_by(|a, b| {
            (&a.reference.file, a.reference.line, a.reference.kind, &a.reference.target).cmp(&(
                &b.reference.file,
                b.reference.line,
                b.reference.kind,
                &b.reference.target,
            ))
        });
        self.references = resolved;
    }

    fn resolve_name(&self, name: &str, file: &str, local: &BTreeSet<&str>) -> Resolution {
        if local.contains(name) {
            Resolution::Resolved(file.to_string())
        } else if let Some(class) = self.classes.get(name) {
            Resolution::Resolved(class.file.clone())
        } else if let Some(a) = self.autoload(name) {
            Resolution::Resolved(a.script.clone().unwrap_or_else(|| a.path.clone()))
        } else if builtins::is_builtin_class(name) {
            Resolution::External
        } else {
            Resolution::Unresolved
        }
    }

    pub fn autoload(&self, name: &str) -> Option<&AutoloadEntry> {
        self.autoloads.iter().find(|a| a.name == name)
    }

    pub fn is_autoload(&self, name: &str) -> bool {
        self.autoload(name).is_some()
    }

    /// Scripts backing autoloads.
    pub fn autoload_scripts(&self) -> BTreeSet<&str> {
        self.autoloads.iter().filter_map(|a| a.script.as_deref()).collect()
    }

    pub fn class_file(&self, name: &str) -> Option<&str> {
        self.classes.get(name).map(|c| c.file.as_str())
    }

    /// Occurrences of an identifier in one file.
    pub fn identifier_count(&self, word: &str, file: &str) -> usize {
        self.identifiers
            .get(word)
            .and_then(|files| files.get(file))
            .copied()
            .unwrap_or(0)
    }

    /// Files (other than `except`) mentioning an identifier.
    pub fn identifier_files_except<'a>(&'a self, word: &str, except: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.identifiers
            .get(word)
            .into_iter()
            .flat_map(|files| files.keys())
            .map(String::as_str)
            .filter(move |f| *f != except)
    }

    pub fn references_of(&self, kind: RefKind) -> impl Iterator<Item = &ResolvedRef> {
        self.references.iter().filter(move |r| r.reference.kind == kind)
    }

    pub fn unresolved_count(&self) -> usize {
        self.references
            .iter()
            .filter(|r| r.resolution == Resolution::Unresolved)
            .count()
    }
}
