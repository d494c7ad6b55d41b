use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Session tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// How often the backend is drained for new raw events, in milliseconds.
    pub poll_interval_ms: u64,
    /// JSONL capture log. Unset means terminal output only.
    pub output: Option<PathBuf>,
    /// Where the recording flag persists between sessions. Unset falls back
    /// to `~/.weaver/state.json`.
    pub state_file: Option<PathBuf>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            output: None,
            state_file: None,
        }
    }
}

impl RecorderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn state_file(&self) -> Option<PathBuf> {
        self.state_file.clone().or_else(default_state_file)
    }
}

fn default_state_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".weaver").join("state.json"))
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./weaver.yaml
    /// 2. ~/.weaver/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<RecorderConfig, ConfigError> {
        let local_config = PathBuf::from("./weaver.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".weaver").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(RecorderConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<RecorderConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: RecorderConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn partial_config_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weaver.yaml");
        std::fs::write(&path, "poll_interval_ms: 250\n").unwrap();

        let config = ConfigLoader::load_from(&path).await.unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert!(config.output.is_none());
    }

    #[tokio::test]
    async fn malformed_config_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weaver.yaml");
        std::fs::write(&path, "poll_interval_ms: [nope\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from(&path).await,
            Err(ConfigError::Parse(_))
        ));
    }
}
