//! Configuration structures and JSON persistence.

pub mod device_config;

pub use device_config::{DeviceConfig, SessionTuning};

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;

/// Top-level configuration aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
}

impl AppConfig {
    /// Loads the config from `path`, falling back to defaults when the
    /// file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found at {path:?}, using defaults");
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Config loaded from {path:?}");
        Ok(config)
    }

    /// Saves the config as pretty JSON, creating parent directories as
    /// needed.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let config_json = serde_json::to_string_pretty(self)?;
        fs::write(path, config_json).await?;

        info!("Config saved to {path:?}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::{DEFAULT_LIGHTNESS, MAX_WRITE_ATTEMPTS};

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"device":{"identity":"aa:bb:cc:dd:ee:ff"}}"#).unwrap();
        assert_eq!(config.device.identity, "aa:bb:cc:dd:ee:ff");
        assert_eq!(config.device.lightness, DEFAULT_LIGHTNESS);
        assert_eq!(config.device.tuning.write_attempts, MAX_WRITE_ATTEMPTS);
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let path = std::env::temp_dir().join("bledom-bridge-config-test.json");
        let mut config = AppConfig::default();
        config.device.identity = "11:22:33:44:55:66".to_string();

        config.save(&path).await.unwrap();
        let loaded = AppConfig::load(&path).await.unwrap();
        assert_eq!(loaded.device.identity, config.device.identity);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let loaded = AppConfig::load(Path::new("/nonexistent/bledom-bridge.json"))
            .await
            .unwrap();
        assert!(loaded.device.identity.is_empty());
    }
}
