//! Configuration schema for gdscan.
//!
//! A config file is optional. Every key has a default, so an empty
//! `gdscan.yaml` behaves exactly like no file at all.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ScanError;

/// Config file names searched for at the project root.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["gdscan.yaml", ".gdscan.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Glob patterns (relative to the project root) excluded from the walk.
    pub excluded_paths: Vec<String>,
    /// Directory names skipped anywhere in the tree, in addition to
    /// leading-dot editor caches.
    pub skip_dirs: Vec<String>,
    /// Wall-clock budget per check in seconds.
    pub timeout_secs: u64,
    /// Per-check threshold overrides keyed by check id.
    pub thresholds: BTreeMap<String, ThresholdOverride>,
    pub naming: NamingConfig,
    pub complexity: ComplexityConfig,
    pub inheritance: InheritanceConfig,
    pub coupling: CouplingConfig,
    pub cycles: CyclesConfig,
    pub duplicates: DuplicatesConfig,
    pub dict_access: DictAccessConfig,
    pub json: JsonConfig,
    pub state: StateConfig,
    pub magic_numbers: MagicNumbersConfig,
    pub scenes: SceneConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            excluded_paths: Vec::new(),
            skip_dirs: vec!["addons".to_string()],
            timeout_secs: 120,
            thresholds: BTreeMap::new(),
            naming: NamingConfig::default(),
            complexity: ComplexityConfig::default(),
            inheritance: InheritanceConfig::default(),
            coupling: CouplingConfig::default(),
            cycles: CyclesConfig::default(),
            duplicates: DuplicatesConfig::default(),
            dict_access: DictAccessConfig::default(),
            json: JsonConfig::default(),
            state: StateConfig::default(),
            magic_numbers: MagicNumbersConfig::default(),
            scenes: SceneConfig::default(),
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content).map_err(|e| ScanError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse a config from YAML text. Empty text yields the defaults.
    pub fn parse_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Look for a config file at the project root.
    pub fn discover(root: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|p| p.is_file())
    }

    /// Load the config for a root: explicit path first, then discovery,
    /// then defaults.
    pub fn load_for_root(root: &Path, explicit: Option<&Path>) -> Result<Self, ScanError> {
        match explicit {
            Some(path) => Self::parse_file(path),
            None => match Self::discover(root) {
                Some(path) => Self::parse_file(path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Check if a project-relative path is excluded by `excluded_paths`.
    pub fn is_path_excluded(&self, rel_path: &str) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }
        self.excluded_paths.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|g| g.compile_matcher().is_match(rel_path))
                .unwrap_or(false)
        })
    }

    /// Threshold override for a check, if configured.
    pub fn threshold_for(&self, check_id: &str) -> Option<&ThresholdOverride> {
        self.thresholds.get(check_id)
    }
}

/// Override of a check's pass/fail threshold.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ThresholdOverride {
    #[serde(default)]
    pub fail_if_ge: Option<f64>,
    #[serde(default)]
    pub pass_if_ge: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Names accepted regardless of convention.
    pub extra_exceptions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ComplexityConfig {
    /// Body lines above which a function is a warning.
    pub max_lines: usize,
    /// Body lines above which a function is reported as info.
    pub soft_lines: usize,
    /// Block nesting above which a function is reported.
    pub max_nesting: usize,
    /// File length above which a file is reported.
    pub max_file_lines: usize,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            max_lines: 50,
            soft_lines: 30,
            max_nesting: 4,
            max_file_lines: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InheritanceConfig {
    pub max_depth: usize,
}

impl Default for InheritanceConfig {
    fn default() -> Self {
        Self { max_depth: 5 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CouplingConfig {
    pub max_efferent: usize,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self { max_efferent: 15 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CyclesConfig {
    /// Longest cycle searched for.
    pub max_depth: usize,
}

impl Default for CyclesConfig {
    fn default() -> Self {
        Self { max_depth: 10 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DuplicatesConfig {
    pub min_lines: usize,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self { min_lines: 6 }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DictAccessConfig {
    /// Receiver names added to the built-in array-like list.
    pub safe_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct JsonConfig {
    /// IDs never reported as orphans, in addition to the built-in list.
    pub entry_points: Vec<String>,
    /// Extra field names holding cross-file ID references.
    pub reference_fields: Vec<String>,
    /// Extra top-level array keys whose elements carry an `id`.
    pub id_arrays: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StateConfig {
    /// Global-state fields. Empty means the built-in list.
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MagicNumbersConfig {
    pub min_occurrences: usize,
}

impl Default for MagicNumbersConfig {
    fn default() -> Self {
        Self { min_occurrences: 3 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneConfig {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_nodes: 150,
        }
    }
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    if config.timeout_secs == 0 {
        anyhow::bail!("timeout_secs must be greater than zero");
    }

    let c = &config.complexity;
    if c.max_lines == 0 || c.soft_lines == 0 {
        anyhow::bail!("complexity thresholds must be greater than zero");
    }
    if c.soft_lines > c.max_lines {
        anyhow::bail!(
            "complexity.soft_lines ({}) must not exceed complexity.max_lines ({})",
            c.soft_lines,
            c.max_lines
        );
    }

    if config.cycles.max_depth < 2 {
        anyhow::bail!("cycles.max_depth must be at least 2");
    }
    if config.duplicates.min_lines == 0 {
        anyhow::bail!("duplicates.min_lines must be greater than zero");
    }

    for (id, t) in &config.thresholds {
        if t.fail_if_ge.is_none() && t.pass_if_ge.is_none() {
            anyhow::bail!("threshold override for {:?} sets neither fail_if_ge nor pass_if_ge", id);
        }
    }

    Ok(())
}
