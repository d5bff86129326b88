//! Configuration loading and management.
//!
//! Bootstrap configuration comes from a TOML file; command-line flags
//! override individual fields. Every field has a default, so the
//! sequencer runs with no configuration file at all.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::params;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Hardware target: the GPIO register block moves between SoC
/// generations, everything else about the register layout is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    /// BCM2835 (Pi 1, Pi Zero)
    #[serde(alias = "pi1", alias = "pizero")]
    Bcm2835,
    /// BCM2836/BCM2837 (Pi 2, Pi 3)
    #[serde(alias = "pi2", alias = "pi3")]
    Bcm2836,
    /// BCM2711 (Pi 4)
    #[serde(alias = "pi4")]
    Bcm2711,
}

impl Board {
    /// Physical base address of the GPIO register window.
    pub fn gpio_base(self) -> u64 {
        match self {
            Board::Bcm2835 => 0x2020_0000,
            Board::Bcm2836 => 0x3F20_0000,
            Board::Bcm2711 => 0xFE20_0000,
        }
    }
}

/// Bootstrap configuration as written in the TOML file; all fields
/// optional so a partial file is fine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub music_dir: Option<PathBuf>,
    pub audio_device: Option<String>,
    pub mixer_control: Option<String>,
    /// Hardware volume 0..=100; absent = leave the mixer alone.
    pub volume_percent: Option<u8>,
    pub board: Option<Board>,
    pub udp_port: Option<u16>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub music_dir: PathBuf,
    pub audio_device: String,
    pub mixer_control: String,
    pub volume_percent: Option<u8>,
    pub board: Board,
    pub udp_port: u16,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            music_dir: PathBuf::from("/home/pi/music"),
            audio_device: "default".to_string(),
            mixer_control: "Master".to_string(),
            volume_percent: None,
            board: Board::Bcm2835,
            udp_port: params::UDP_PORT,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with command-line overrides.
    ///
    /// When `path` is `None` the defaults are used directly. A named
    /// file that does not exist or does not parse is an error.
    pub fn load(
        path: Option<&Path>,
        music_dir_override: Option<PathBuf>,
        verbose: bool,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.to_path_buf(),
                    source,
                })?;
                toml::from_str::<TomlConfig>(&text).map_err(|source| ConfigError::Parse {
                    path: p.to_path_buf(),
                    source,
                })?
            }
            None => TomlConfig::default(),
        };

        let defaults = Config::default();
        Ok(Config {
            music_dir: music_dir_override
                .or(file.music_dir)
                .unwrap_or(defaults.music_dir),
            audio_device: file.audio_device.unwrap_or(defaults.audio_device),
            mixer_control: file.mixer_control.unwrap_or(defaults.mixer_control),
            volume_percent: file.volume_percent,
            board: file.board.unwrap_or(defaults.board),
            udp_port: file.udp_port.unwrap_or(defaults.udp_port),
            verbose,
        })
    }
}
