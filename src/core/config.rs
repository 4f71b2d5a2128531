use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const API_KEY_ENV: &str = "TICKWATCH_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SyncSettings {
    pub steady_interval_secs: u64,
    pub error_interval_secs: u64,
    pub request_pause_ms: u64,
    pub max_write_failures: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            steady_interval_secs: 300,
            error_interval_secs: 60,
            request_pause_ms: 100,
            max_write_failures: 3,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "tickwatch", "tickwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "tickwatch", "tickwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.apply_env_overrides(std::env::var(API_KEY_ENV).ok());
        debug!("Successfully loaded config");
        Ok(config)
    }

    fn apply_env_overrides(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            debug!("Using provider API key from {}", API_KEY_ENV);
            self.provider.api_key = Some(key);
        }
        self.provider.api_key = self.provider.api_key.take().filter(|k| !k.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
provider:
  base_url: "http://example.com/api"
  api_key: "secret"
  timeout_secs: 5
sync:
  steady_interval_secs: 120
  error_interval_secs: 30
  request_pause_ms: 250
  max_write_failures: 5
data_path: "/tmp/tickwatch"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.provider.base_url, "http://example.com/api");
        assert_eq!(config.provider.api_key.as_deref(), Some("secret"));
        assert_eq!(config.provider.timeout(), Duration::from_secs(5));
        assert_eq!(config.sync.steady_interval_secs, 120);
        assert_eq!(config.sync.error_interval_secs, 30);
        assert_eq!(config.sync.request_pause_ms, 250);
        assert_eq!(config.sync.max_write_failures, 5);
        assert_eq!(
            config.data_path().unwrap(),
            PathBuf::from("/tmp/tickwatch")
        );
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("data_path: ~").unwrap();
        assert_eq!(config.provider.base_url, "https://api.coingecko.com/api/v3");
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.provider.timeout(), Duration::from_secs(10));
        assert_eq!(config.sync.steady_interval_secs, 300);
        assert_eq!(config.sync.error_interval_secs, 60);
        assert_eq!(config.sync.request_pause_ms, 100);
        assert_eq!(config.sync.max_write_failures, 3);

        // Partial sync section keeps the remaining defaults
        let partial: AppConfig =
            serde_yaml::from_str("sync:\n  steady_interval_secs: 10\n").unwrap();
        assert_eq!(partial.sync.steady_interval_secs, 10);
        assert_eq!(partial.sync.error_interval_secs, 60);
    }

    #[test]
    fn test_env_api_key_overrides_file() {
        let mut config: AppConfig =
            serde_yaml::from_str("provider:\n  api_key: from-file\n").unwrap();

        config.apply_env_overrides(Some(String::new()));
        assert_eq!(config.provider.api_key.as_deref(), Some("from-file"));

        config.apply_env_overrides(Some("from-env".to_string()));
        assert_eq!(config.provider.api_key.as_deref(), Some("from-env"));

        let mut blank: AppConfig = serde_yaml::from_str("provider:\n  api_key: \"\"\n").unwrap();
        blank.apply_env_overrides(None);
        assert!(blank.provider.api_key.is_none());
    }
}
