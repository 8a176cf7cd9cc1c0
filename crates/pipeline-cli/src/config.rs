//! Runner configuration storage
//!
//! Settings live in `<data dir>/config.json`. A missing file means
//! defaults; missing keys take their default value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pipeline_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Directory name under the platform data dir
pub const APP_DIR_NAME: &str = "ad-pipeline";

fn default_max_concurrency() -> usize {
    EngineConfig::default().max_concurrency
}

fn default_request_timeout_secs() -> u64 {
    300
}

/// Runner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Where saved pipelines live (default: the data dir itself)
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    /// Execute endpoint for remote dispatch; local handlers only when unset
    #[serde(default)]
    pub dispatch_url: Option<String>,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-dispatch HTTP timeout, 0 disables it
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            dispatch_url: None,
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from disk
    pub async fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = data_dir.join("config.json");

        if !config_path.exists() {
            log::debug!("No config at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path).await?;
        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, data_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(data_dir).await?;

        let config_path = data_dir.join("config.json");
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(&config_path, contents).await?;

        log::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    pub fn store_dir_or<'a>(&'a self, data_dir: &'a Path) -> &'a Path {
        self.store_dir.as_deref().unwrap_or(data_dir)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_concurrency: self.max_concurrency.max(1),
        }
    }
}

/// Default data directory, `<platform data dir>/ad-pipeline`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = RunnerConfig::load(dir.path()).await.unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.store_dir_or(dir.path()), dir.path());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{
                "dispatch_url": "http://localhost:3000/api/pipeline/execute",
                "request_timeout_secs": 0
            }"#,
        )
        .unwrap();

        let config = RunnerConfig::load(dir.path()).await.unwrap();
        assert_eq!(
            config.dispatch_url.as_deref(),
            Some("http://localhost:3000/api/pipeline/execute")
        );
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.request_timeout(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let config = RunnerConfig {
            max_concurrency: 0,
            store_dir: Some(dir.path().join("pipelines")),
            ..RunnerConfig::default()
        };
        config.save(dir.path()).await.unwrap();

        let loaded = RunnerConfig::load(dir.path()).await.unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.engine_config().max_concurrency, 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), "{not json").unwrap();
        assert!(matches!(
            RunnerConfig::load(dir.path()).await,
            Err(ConfigError::Parse(_))
        ));
    }
}
