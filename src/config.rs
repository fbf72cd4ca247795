//! Configuration for the tutor gateway
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! variables. All file fields are optional — the file is a partial overlay
//! on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::client::DEFAULT_API_BASE;
use crate::{Error, Result};

/// Default playback rate multiplier for synthesized replies
///
/// Slightly elevated for clarity; a product choice, not an invariant.
pub const DEFAULT_PLAYBACK_SPEED: f32 = 1.12;

/// Allowed playback speed range
const PLAYBACK_SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.5..=2.0;

/// Resolved gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base address of the tutor backend (`/stt`, `/chat`, `/tts`)
    pub api_base: String,

    /// Playback rate multiplier for synthesized replies
    pub playback_speed: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            playback_speed: DEFAULT_PLAYBACK_SPEED,
        }
    }
}

/// TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    /// Backend base address
    api_base: Option<String>,

    /// Voice/audio settings
    #[serde(default)]
    voice: VoiceFileConfig,
}

/// Voice settings in the configuration file
#[derive(Debug, Default, Deserialize)]
struct VoiceFileConfig {
    /// Playback rate multiplier
    playback_speed: Option<f32>,
}

impl Config {
    /// Load configuration from defaults, file, and environment
    ///
    /// When `path` is given the file must exist; otherwise the default
    /// location (`<config dir>/tutor-gateway/config.toml`) is used if
    /// present and skipped if not.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit file is missing or either file fails
    /// to parse
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let file = match path {
            Some(p) => Some(read_config_file(p)?),
            None => match default_config_path() {
                Some(p) if p.exists() => Some(read_config_file(&p)?),
                _ => None,
            },
        };

        if let Some(file) = file {
            if let Some(api_base) = file.api_base {
                config.api_base = api_base;
            }
            if let Some(speed) = file.voice.playback_speed {
                config.playback_speed = speed;
            }
        }

        if let Ok(api_base) = std::env::var("TUTOR_API_BASE") {
            if !api_base.trim().is_empty() {
                config.api_base = api_base;
            }
        }
        if let Ok(speed) = std::env::var("TUTOR_PLAYBACK_SPEED") {
            match speed.parse::<f32>() {
                Ok(speed) => config.playback_speed = speed,
                Err(_) => {
                    return Err(Error::Config(format!(
                        "TUTOR_PLAYBACK_SPEED is not a number: {speed}"
                    )))
                }
            }
        }

        config.api_base = config.api_base.trim_end_matches('/').to_string();
        config.playback_speed = clamp_speed(config.playback_speed);

        tracing::debug!(
            api_base = %config.api_base,
            playback_speed = config.playback_speed,
            "configuration resolved"
        );
        Ok(config)
    }

    /// Apply a runtime override of the backend address
    pub fn override_api_base(&mut self, api_base: &str) {
        self.api_base = api_base.trim_end_matches('/').to_string();
    }

    /// Apply a runtime override of the playback speed, kept in range
    pub fn override_playback_speed(&mut self, speed: f32) {
        self.playback_speed = clamp_speed(speed);
    }
}

/// Keep the playback speed inside a usable range
fn clamp_speed(speed: f32) -> f32 {
    if PLAYBACK_SPEED_RANGE.contains(&speed) {
        speed
    } else {
        let clamped = speed.clamp(*PLAYBACK_SPEED_RANGE.start(), *PLAYBACK_SPEED_RANGE.end());
        tracing::warn!(requested = speed, using = clamped, "playback speed out of range");
        clamped
    }
}

/// Default persistent config location
fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("tutor-gateway/config.toml"))
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    Ok(toml::from_str(&raw)?)
}
