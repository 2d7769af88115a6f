//! gdscan - static analysis for GDScript projects.
//!
//! gdscan walks a Godot project, reads `.gd` scripts, `.tscn` scenes, `.json`
//! data files and `project.godot`, and runs a registry of checks over the
//! shared facts. GDScript is read lexically, one line at a time; there is no
//! grammar and no type inference.
//!
//! # Architecture
//!
//! - `project`: walking, reading and assembling a [`Project`]
//! - `lex`: per-line extractors producing [`FileFacts`] for each script
//! - `scene`, `data`: scene and JSON data readers
//! - `index`: cross-file tables built once per run
//! - `checks`: the [`Check`] trait, the registry and the runner
//! - `fix`: line-based auto-fixers
//! - `report`: text, JSON, markdown and SARIF output
//! - `orchestrator`: suite runs and the pass/fail roll-up
//!
//! # Adding a Check
//!
//! Implement [`Check`] in a new module under `src/checks/` and add it to
//! `checks::registry`.

pub mod checks;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod fix;
pub mod index;
pub mod lex;
pub mod orchestrator;
pub mod project;
pub mod report;
pub mod scene;

pub use checks::{Check, CheckOptions, CheckOutput, CheckRun, Issue, Runner, Severity, Status};
pub use config::Config;
pub use error::ScanError;
pub use index::Index;
pub use lex::FileFacts;
pub use orchestrator::{run_suite, Mode, SuiteOptions, SuiteReport};
pub use project::{Layer, Project, SourceFile};
