//! Bootstrap configuration loading and settings resolution
//!
//! Settings are resolved per field in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (handled by the CLI layer, surfaces as an override)
//! 3. TOML config file
//! 4. Built-in defaults (fallback)

use crate::{Error, ResampleQuality, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default number of frames pulled from the decoder per loop iteration
pub const DEFAULT_CHUNK_FRAMES: usize = 4096;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Read/resample defaults
    #[serde(default)]
    pub read: ReadConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[read]` table of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadConfig {
    /// Target sample rate; absent or 0 keeps the native rate
    #[serde(default)]
    pub sample_rate: Option<u32>,

    /// Resampling quality preset
    #[serde(default)]
    pub quality: ResampleQuality,

    /// Zero-pad resampled output up to the exact expected length
    #[serde(default = "default_padding")]
    pub padding: bool,

    /// Frames decoded per loop iteration
    #[serde(default = "default_chunk_frames")]
    pub chunk_frames: usize,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            sample_rate: None,
            quality: ResampleQuality::default(),
            padding: default_padding(),
            chunk_frames: default_chunk_frames(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_padding() -> bool {
    true
}

fn default_chunk_frames() -> usize {
    DEFAULT_CHUNK_FRAMES
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Get default configuration file path for the platform
///
/// `~/.config/audiobuf/config.toml` on Linux, the platform config directory elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("audiobuf").join("config.toml"))
}

/// Load the bootstrap TOML configuration.
///
/// - `explicit` path given: the file must exist and parse.
/// - No path given: the platform default is tried; a missing file yields defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            read_toml_config(path)
        }
        None => match default_config_path() {
            Some(path) if path.exists() => read_toml_config(&path),
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Ok(TomlConfig::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(TomlConfig::default())
            }
        },
    }
}

/// Parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Values supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ReadOverrides {
    pub sample_rate: Option<u32>,
    pub quality: Option<ResampleQuality>,
    /// `Some(false)` when padding was explicitly disabled
    pub padding: Option<bool>,
    pub chunk_frames: Option<usize>,
}

/// Fully resolved read settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSettings {
    /// Target sample rate; `None` keeps the native rate
    pub sample_rate: Option<u32>,
    pub quality: ResampleQuality,
    pub padding: bool,
    pub chunk_frames: usize,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self::resolve(&ReadConfig::default(), &ReadOverrides::default())
            .unwrap_or(Self {
                sample_rate: None,
                quality: ResampleQuality::default(),
                padding: true,
                chunk_frames: DEFAULT_CHUNK_FRAMES,
            })
    }
}

impl ReadSettings {
    /// Merge overrides on top of the file configuration.
    ///
    /// # Errors
    /// `Error::Config` if the resulting chunk size is zero.
    pub fn resolve(file: &ReadConfig, overrides: &ReadOverrides) -> Result<Self> {
        let sample_rate = overrides
            .sample_rate
            .or(file.sample_rate)
            .filter(|&rate| rate > 0);
        let chunk_frames = overrides.chunk_frames.unwrap_or(file.chunk_frames);

        if chunk_frames == 0 {
            return Err(Error::Config("chunk_frames must be greater than 0".to_string()));
        }

        Ok(Self {
            sample_rate,
            quality: overrides.quality.unwrap_or(file.quality),
            padding: overrides.padding.unwrap_or(file.padding),
            chunk_frames,
        })
    }
}
