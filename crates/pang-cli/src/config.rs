use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use pang::{now_millis, PhotoCooldown, PreferenceStore, PHOTO_COOLDOWN_MS};

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Display nickname, written after every named send
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    /// Shared event store location (default: <data_dir>/store)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,

    /// When this machine last sent a photo (unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_photo_sent_at: Option<u64>,

    /// Path to the config file
    #[serde(skip)]
    pub path: PathBuf,
}

impl Config {
    /// Load config from the data directory
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("config.json");

        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                serde_json::from_str(&content).context("Failed to parse config file")?;
            config.path = config_path;
            Ok(config)
        } else {
            Ok(Config {
                path: config_path,
                ..Default::default()
            })
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context("Failed to write config file")?;
        std::fs::rename(&temp_path, &self.path).context("Failed to write config file")?;
        Ok(())
    }

    pub fn set_nickname(&mut self, nickname: &str) -> Result<()> {
        let nickname = nickname.trim();
        self.nickname = (!nickname.is_empty()).then(|| nickname.to_string());
        self.save()
    }

    pub fn record_photo_sent(&mut self, at: u64) -> Result<()> {
        self.last_photo_sent_at = Some(at);
        self.save()
    }

    /// The store directory, relative paths resolved against `data_dir`.
    pub fn resolved_store_dir(&self, data_dir: &Path) -> PathBuf {
        match &self.store_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => data_dir.join(dir),
            None => data_dir.join("store"),
        }
    }

    /// Photo cooldown carried over from the previous invocation.
    pub fn photo_cooldown(&self) -> PhotoCooldown {
        let period = Duration::from_millis(PHOTO_COOLDOWN_MS);
        match self.last_photo_sent_at {
            Some(at) => {
                let elapsed = Duration::from_millis(now_millis().saturating_sub(at));
                PhotoCooldown::resumed(period, elapsed)
            }
            None => PhotoCooldown::new(period),
        }
    }
}

/// Config shared with the composer as its nickname preference.
pub struct SharedConfig {
    config: Mutex<Config>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    pub fn record_photo_sent(&self, at: u64) -> Result<()> {
        self.config.lock().unwrap().record_photo_sent(at)
    }
}

impl PreferenceStore for SharedConfig {
    fn nickname(&self) -> Option<String> {
        self.config.lock().unwrap().nickname.clone()
    }

    fn set_nickname(&self, nickname: &str) -> pang::Result<()> {
        self.config
            .lock()
            .unwrap()
            .set_nickname(nickname)
            .map_err(|e| pang::Error::Storage(e.to_string()))
    }
}
