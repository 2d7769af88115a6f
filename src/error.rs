//! Error types for project loading.
//!
//! Rule violations are never errors; they surface as `Issue`s. These
//! variants cover input problems only.

use std::path::PathBuf;

use thiserror::Error;

/// Input errors raised while discovering and reading a project.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("project root {0} does not exist or is not a directory")]
    MissingRoot(PathBuf),

    #[error("requested file {0} is not part of the project")]
    MissingFile(String),

    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {message}")]
    Json { path: String, message: String },

    #[error("malformed project file at line {line}: {message}")]
    ProjectFile { line: usize, message: String },

    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl ScanError {
    /// Short machine tag used as the issue type when the error is demoted.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::MissingRoot(_) => "missing_root",
            ScanError::MissingFile(_) => "missing_file",
            ScanError::Read { .. } => "unreadable_file",
            ScanError::Json { .. } => "malformed_json",
            ScanError::ProjectFile { .. } => "malformed_project_file",
            ScanError::Config { .. } => "invalid_config",
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
