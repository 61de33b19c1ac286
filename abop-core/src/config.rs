//! Centralized configuration (§6.4). Persisted as TOML under the
//! platform config directory and reloadable without a restart by callers
//! that want to re-read it.

use crate::constants::{
    DEFAULT_CONCURRENT_SCANS, DEFAULT_OPERATION_WORKERS, DEFAULT_PROVIDER_TIMEOUT_SECONDS,
    DEFAULT_PURGE_RETENTION_DAYS, DEFAULT_SUPPORTED_EXTENSIONS, config::CONFIG_FILE,
};
use crate::error::{AppError, Result};
use crate::organizer::OrganizeStrategy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One configured metadata provider (§6.4 "ordered list of enabled
/// providers with per-provider config"). Provider-specific settings (API
/// keys, base URLs) are kept as opaque TOML so new providers don't require
/// a schema change here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub settings: toml::Table,
}

/// Recognized configuration options (§6.4). Anything not listed here is
/// rejected by `toml`'s default deny-unknown-fields-off behavior — i.e.
/// unknown keys are ignored rather than erroring, so older config files
/// keep loading across upgrades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub root_dir: PathBuf,
    #[serde(default)]
    pub import_paths: Vec<PathBuf>,
    #[serde(default = "default_extensions")]
    pub supported_extensions: Vec<String>,
    #[serde(default = "default_folder_pattern")]
    pub folder_naming_pattern: String,
    #[serde(default = "default_file_pattern")]
    pub file_naming_pattern: String,
    #[serde(default)]
    pub organization_strategy: OrganizeStrategy,
    #[serde(default)]
    pub scan_on_startup: bool,
    #[serde(default)]
    pub auto_organize: bool,
    #[serde(default = "default_concurrent_scans")]
    pub concurrent_scans: usize,
    #[serde(default = "default_operation_workers")]
    pub operation_workers: usize,
    #[serde(default = "default_purge_retention_days")]
    pub purge_soft_deleted_after_days: i64,
    #[serde(default)]
    pub purge_soft_deleted_delete_files: bool,
    #[serde(default)]
    pub metadata_providers: Vec<ProviderConfig>,
    #[serde(default = "default_provider_timeout_seconds")]
    pub provider_call_timeout_seconds: u64,
}

impl Default for OrganizeStrategy {
    fn default() -> Self {
        Self::Move
    }
}

fn default_extensions() -> Vec<String> {
    DEFAULT_SUPPORTED_EXTENSIONS.iter().map(|s| (*s).to_string()).collect()
}

fn default_folder_pattern() -> String {
    "{author}/{series}/{title} ({year})".to_string()
}

fn default_file_pattern() -> String {
    "{title} - {author} - read by {narrator}".to_string()
}

fn default_concurrent_scans() -> usize {
    DEFAULT_CONCURRENT_SCANS
}

fn default_operation_workers() -> usize {
    DEFAULT_OPERATION_WORKERS
}

fn default_purge_retention_days() -> i64 {
    DEFAULT_PURGE_RETENTION_DAYS
}

fn default_provider_timeout_seconds() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECONDS
}

impl Config {
    /// Loads configuration from the platform config directory, writing out
    /// defaults if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory can't be determined, the
    /// file can't be read, or its contents aren't valid TOML.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default = Self::default();
            default.save()?;
            Ok(default)
        }
    }

    /// Writes this configuration to the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory can't be created or the
    /// contents can't be serialized/written.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir().ok_or_else(|| AppError::Other("could not find config directory".to_string()))?;
        path.push("abop");
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Builds the [`crate::organizer::OrganizeConfig`] the organizer needs
    /// from this configuration.
    #[must_use]
    pub fn organize_config(&self) -> crate::organizer::OrganizeConfig {
        crate::organizer::OrganizeConfig {
            root_dir: self.root_dir.clone(),
            folder_pattern: self.folder_naming_pattern.clone(),
            file_pattern: self.file_naming_pattern.clone(),
            strategy: self.organization_strategy,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: dirs::data_dir().unwrap_or_else(|| PathBuf::from("./library")).join("abop"),
            import_paths: Vec::new(),
            supported_extensions: default_extensions(),
            folder_naming_pattern: default_folder_pattern(),
            file_naming_pattern: default_file_pattern(),
            organization_strategy: OrganizeStrategy::Move,
            scan_on_startup: false,
            auto_organize: false,
            concurrent_scans: default_concurrent_scans(),
            operation_workers: default_operation_workers(),
            purge_soft_deleted_after_days: default_purge_retention_days(),
            purge_soft_deleted_delete_files: false,
            metadata_providers: Vec::new(),
            provider_call_timeout_seconds: default_provider_timeout_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.folder_naming_pattern, config.folder_naming_pattern);
        assert_eq!(parsed.concurrent_scans, config.concurrent_scans);
    }

    #[test]
    fn missing_optional_keys_fall_back_to_documented_defaults() {
        let minimal = "root_dir = \"/library\"\n";
        let config: Config = toml::from_str(minimal).unwrap();
        assert_eq!(config.concurrent_scans, DEFAULT_CONCURRENT_SCANS);
        assert_eq!(config.organization_strategy, OrganizeStrategy::Move);
        assert!(!config.scan_on_startup);
    }
}
