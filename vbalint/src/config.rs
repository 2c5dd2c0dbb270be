//! Engine configuration: severity overrides, disabled inspections, and
//! the worker-pool hint.
//!
//! Loaded from a `.vbalint.toml` found by walking up from the analysis
//! root, or built programmatically by the host. Absent settings fall back
//! to each inspection's declared attributes.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::inspections::{Inspection, Severity};

/// Name of the configuration file searched for in the project tree.
pub const CONFIG_FILENAME: &str = ".vbalint.toml";

/// Top-level configuration struct.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// The main configuration section for vbalint.
    #[serde(default)]
    pub vbalint: VbalintConfig,
    /// The path to the configuration file this was loaded from.
    /// `None` if using defaults or programmatic config.
    #[serde(skip)]
    pub config_file_path: Option<std::path::PathBuf>,
}

/// Configuration options for the inspection engine.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct VbalintConfig {
    /// Per-inspection severity overrides (inspection name -> severity).
    /// Overriding to `do_not_show` disables the inspection.
    #[serde(default, alias = "severity-overrides")]
    pub severity_overrides: FxHashMap<String, Severity>,
    /// Inspections excluded from every pass, by name.
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Size of the worker pool used for one pass. Defaults to the global
    /// rayon pool when unset.
    pub workers: Option<usize>,
}

impl Config {
    /// Loads configuration from the current directory upward.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from_path(Path::new("."))
    }

    /// Loads configuration starting from a specific path and traversing up.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        let mut current = path.to_path_buf();
        if current.is_file() {
            current.pop();
        }

        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                if let Ok(content) = fs::read_to_string(&candidate) {
                    if let Ok(mut config) = toml::from_str::<Self>(&content) {
                        config.config_file_path = Some(candidate);
                        return config;
                    }
                    tracing::warn!(path = %candidate.display(), "ignoring malformed config file");
                }
            }

            if !current.pop() {
                break;
            }
        }

        Self::default()
    }

    /// The severity an inspection runs at under this configuration:
    /// disabled list first, then explicit override, then the inspection's
    /// declared severity.
    #[must_use]
    pub fn effective_severity(&self, inspection: &dyn Inspection) -> Severity {
        let name = inspection.name();
        if self.vbalint.disabled.iter().any(|d| d == name) {
            return Severity::DoNotShow;
        }
        self.vbalint
            .severity_overrides
            .get(name)
            .copied()
            .unwrap_or_else(|| inspection.severity())
    }

    /// Builds the dedicated worker pool requested by the configuration,
    /// if any. Falls back to the global pool when construction fails.
    pub(crate) fn worker_pool(&self) -> Option<rayon::ThreadPool> {
        let workers = self.vbalint.workers?;
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => Some(pool),
            Err(error) => {
                tracing::warn!(%error, "falling back to the global worker pool");
                None
            }
        }
    }
}
