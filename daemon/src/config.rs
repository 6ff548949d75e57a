//! Configuration loading and management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::session::{SessionDuration, Settings};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "ZENITH_DATA_DIR";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Audio settings the session starts with
    pub settings: Settings,

    /// Session length the clock starts with
    pub duration: SessionDuration,
}

/// On-disk settings surface, every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SettingsFile {
    sound_enabled: Option<bool>,
    breathing_guidance_enabled: Option<bool>,
    ambient_sound_enabled: Option<bool>,
    duration: Option<u32>,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let home = std::env::var("HOME").context("HOME is not set")?;
                PathBuf::from(&home)
                    .join(".local")
                    .join("share")
                    .join("zenith")
            }
        };

        Self::from_data_dir(data_dir)
    }

    /// Build the configuration rooted at `data_dir`, reading
    /// `settings.json` from it when present
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let socket_path = data_dir.join("daemon.sock");
        let file = read_settings_file(&data_dir.join("settings.json"))?;

        let defaults = Settings::default();
        let settings = Settings {
            sound_enabled: file.sound_enabled.unwrap_or(defaults.sound_enabled),
            breathing_guidance_enabled: file
                .breathing_guidance_enabled
                .unwrap_or(defaults.breathing_guidance_enabled),
            ambient_sound_enabled: file
                .ambient_sound_enabled
                .unwrap_or(defaults.ambient_sound_enabled),
        };

        let duration = match file.duration.map(SessionDuration::try_from) {
            Some(Ok(duration)) => duration,
            Some(Err(e)) => {
                warn!(error = %e, "ignoring configured duration");
                SessionDuration::default()
            }
            None => SessionDuration::default(),
        };

        Ok(Self {
            socket_path,
            data_dir,
            settings,
            duration,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn read_settings_file(path: &Path) -> Result<SettingsFile> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SettingsFile::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    let file = serde_json::from_str(&contents)
        .with_context(|| format!("invalid settings file {}", path.display()))?;
    info!(?path, "settings file loaded");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("zenith-config-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = scratch_dir("defaults");
        let config = Config::from_data_dir(dir.clone()).unwrap();
        assert_eq!(config.socket_path, dir.join("daemon.sock"));
        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.duration.secs(), 300);
    }

    #[test]
    fn test_settings_file_overrides() {
        let dir = scratch_dir("overrides");
        std::fs::write(
            dir.join("settings.json"),
            r#"{"ambientSoundEnabled": true, "soundEnabled": false, "duration": 900}"#,
        )
        .unwrap();

        let config = Config::from_data_dir(dir).unwrap();
        assert!(!config.settings.sound_enabled);
        assert!(config.settings.breathing_guidance_enabled);
        assert!(config.settings.ambient_sound_enabled);
        assert_eq!(config.duration.secs(), 900);
    }

    #[test]
    fn test_invalid_duration_falls_back_to_default() {
        let dir = scratch_dir("bad-duration");
        std::fs::write(dir.join("settings.json"), r#"{"duration": 45}"#).unwrap();

        let config = Config::from_data_dir(dir).unwrap();
        assert_eq!(config.duration.secs(), 300);
    }

    #[test]
    fn test_malformed_settings_file_is_an_error() {
        let dir = scratch_dir("malformed");
        std::fs::write(dir.join("settings.json"), "{ not json").unwrap();
        assert!(Config::from_data_dir(dir).is_err());
    }
}
