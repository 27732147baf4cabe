//! Service configuration, loaded from a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_DIR: &str = "omxremote";
const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("Invalid config JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("Invalid config: {0}")]
  Invalid(String),
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
  /// Custom omxplayer executable path (None = auto-detect).
  #[serde(default)]
  pub player_path: Option<String>,

  /// Extra omxplayer options, space separated, passed verbatim.
  #[serde(default)]
  pub extra_options: String,

  /// Audio output device (`--adev`). Empty disables the flag.
  #[serde(default = "default_audio_device")]
  pub audio_device: String,

  /// Process names killed during cleanup to catch orphaned players.
  #[serde(default = "default_stray_process_names")]
  pub stray_process_names: Vec<String>,
}

fn default_audio_device() -> String {
  "hdmi".to_string()
}

fn default_stray_process_names() -> Vec<String> {
  vec!["omxplayer.bin".to_string(), "omxplayer".to_string()]
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      player_path: None,
      extra_options: String::new(),
      audio_device: default_audio_device(),
      stray_process_names: default_stray_process_names(),
    }
  }
}

impl AppConfig {
  /// Default config file location, e.g. `~/.config/omxremote/config.json`.
  pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
  }

  /// Load config from a JSON file. A missing file yields the defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let data = match std::fs::read_to_string(path) {
      Ok(data) => data,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(Self::default());
      }
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        })
      }
    };

    let config: Self = serde_json::from_str(&data)?;
    config.validate()?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
  }

  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if let Some(path) = &self.player_path {
      if path.trim().is_empty() {
        return Err(ConfigError::Invalid("Player path cannot be empty".to_string()));
      }
    }
    if self
      .stray_process_names
      .iter()
      .any(|name| name.trim().is_empty())
    {
      return Err(ConfigError::Invalid(
        "Stray process names cannot be empty".to_string(),
      ));
    }
    Ok(())
  }

  /// Extra options split into launch arguments.
  pub fn extra_args(&self) -> Vec<String> {
    self
      .extra_options
      .split_whitespace()
      .map(str::to_string)
      .collect()
  }
}
