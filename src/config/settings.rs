use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::NewSitePolicy;
use crate::errors::{Result, SaltSealError};

/// Working-directory configuration, loaded from `.saltseal.toml`.
///
/// Every field has a sensible default so SaltSeal works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory where `create-project` writes new salt files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Fail `add-sites` when every listed site already has a record.
    #[serde(default)]
    pub require_new_sites: bool,

    /// Log filter used when `SALTSEAL_LOG` is unset (e.g. "warn", "debug").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            require_new_sites: false,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    const FILE_NAME: &'static str = ".saltseal.toml";

    /// Load settings from `<dir>/.saltseal.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            SaltSealError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Resolve the output directory against `dir` when it is relative.
    pub fn output_dir(&self, dir: &Path) -> PathBuf {
        dir.join(&self.output_dir)
    }

    /// The `add-sites` policy these settings select.
    pub fn new_site_policy(&self) -> NewSitePolicy {
        if self.require_new_sites {
            NewSitePolicy::RequireNewSites
        } else {
            NewSitePolicy::AllowNoop
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
