//! Configuration loading and resolution
//!
//! Settings come from a TOML file resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ETDQ_CONFIG` environment variable
//! 3. `~/.config/etdq/config.toml`, then `/etc/etdq/config.toml`

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Bibliographic catalog (Alma) settings.
///
/// The read and write keys are deliberately separate: the read-only key is
/// used for every fetch, and only the electronic-location update uses the
/// write-scoped key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Base URL of the catalog bib API
    pub base_url: String,
    /// Read-only API key
    pub read_key: String,
    /// Write-scoped API key (electronic-location updates only)
    pub write_key: String,
}

/// Object storage settings for bag content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Bucket holding bagged content
    pub bucket: String,
    /// Source segment of the key prefix (`private/<source>/<bag>/data/`)
    pub source: String,
    /// Optional custom endpoint (MinIO / localstack)
    pub endpoint: Option<String>,
}

impl StorageSettings {
    /// Key prefix under which a bag's content files live
    pub fn data_prefix(&self, bag: &str) -> String {
        format!("private/{}/{}/data/", self.source, bag)
    }
}

/// Tracking store / request queue document API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSettings {
    /// Base URL of the data catalog API
    pub base_url: String,
    /// API token for mutating requests
    pub token: Option<String>,
    /// Application sub-document name (`application.<name>`)
    #[serde(default = "default_application")]
    pub application: String,
}

fn default_application() -> String {
    "dspace".to_string()
}

/// Repository import mechanism settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    /// Bulk-import command to invoke against a staging directory
    pub import_command: String,
    /// E-person the import is attributed to
    pub eperson: String,
    /// Public FQDN prefixed to assigned handles
    pub fqdn: String,
    /// Owner applied (`chown -R`) to the staging area before invocation,
    /// when the import mechanism runs under a different service identity
    pub staging_owner: Option<String>,
}

/// Collection classifier vocabulary and routing table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSettings {
    /// Fallback organization code when no keyword matches
    pub default_org: String,
    /// Fallback work type when no keyword matches
    pub default_type: String,
    /// Keyword (lowercased) to organization code
    pub organizations: HashMap<String, String>,
    /// `<ORG>_<TYPE>` to collection handle
    pub collections: HashMap<String, String>,
}

/// Full ETDQ settings document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub catalog: CatalogSettings,
    pub storage: StorageSettings,
    pub tracking: TrackingSettings,
    pub repository: RepositorySettings,
    pub classifier: ClassifierSettings,
}

impl Settings {
    /// Load settings from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Resolve the settings file path and load it
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        Self::load(&resolve_config_path(cli_arg)?)
    }
}

/// Resolve the configuration file location
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("ETDQ_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: user config, then system config
    if let Some(user_config) = dirs::config_dir().map(|d| d.join("etdq").join("config.toml")) {
        if user_config.exists() {
            return Ok(user_config);
        }
    }
    let system_config = PathBuf::from("/etc/etdq/config.toml");
    if system_config.exists() {
        return Ok(system_config);
    }

    Err(Error::Config(
        "No config file found. Provide --config, set ETDQ_CONFIG, \
         or create ~/.config/etdq/config.toml"
            .to_string(),
    ))
}
