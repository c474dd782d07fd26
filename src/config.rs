//! Configuration loaded from `<config_dir>/media-fetch/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::downloader::extractors::{ExtractorConfig, ExtractorMode};
use crate::downloader::models::{QualitySelection, DEFAULT_FILENAME_TEMPLATE};

pub const APP_DIR: &str = "media-fetch";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config directory for this platform")]
    NoConfigDir,

    #[error("config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Global configuration. Every key is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Save folder used when none is given; home directory when unset.
    pub default_destination: Option<PathBuf>,
    /// Quality label ("best", "1080p", "720p", "480p", "audio").
    pub default_quality: String,
    /// Output filename template with `{field}` placeholders.
    pub filename_template: String,
    /// How yt-dlp is launched: "cli", "python" or "auto".
    pub extractor_mode: ExtractorMode,
    /// Explicit yt-dlp binary.
    pub ytdlp_path: Option<PathBuf>,
    /// Python interpreter for module mode.
    pub python_path: Option<PathBuf>,
    /// ffmpeg binary or the directory containing it.
    pub ffmpeg_location: Option<PathBuf>,
    /// Network socket timeout passed to yt-dlp.
    pub socket_timeout_secs: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_destination: None,
            default_quality: QualitySelection::Highest.as_str().to_string(),
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            extractor_mode: ExtractorMode::Auto,
            ytdlp_path: None,
            python_path: None,
            ffmpeg_location: None,
            socket_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Configured quality; unknown labels fall back to Highest
    pub fn quality(&self) -> QualitySelection {
        self.default_quality.parse().unwrap_or_else(|_| {
            tracing::warn!(label = %self.default_quality, "unknown default_quality, using best");
            QualitySelection::Highest
        })
    }

    /// Configured save folder, else the user's home directory, else "."
    pub fn destination(&self) -> PathBuf {
        self.default_destination
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig::default()
            .with_mode(self.extractor_mode)
            .with_ytdlp_path(self.ytdlp_path.clone())
            .with_python_path(self.python_path.clone())
            .with_ffmpeg_location(self.ffmpeg_location.clone())
            .with_timeout(self.socket_timeout_secs)
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(dir.join(APP_DIR).join("config.toml"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AppConfig, ConfigError> {
    load_or_init_at(config_path()?)
}

pub fn load_or_init_at(path: PathBuf) -> Result<AppConfig, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.clone(),
        source,
    };

    if !path.exists() {
        let default_cfg = AppConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&path, toml).map_err(io_err)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).map_err(io_err)?;
    let cfg: AppConfig = toml::from_str(&data)?;
    Ok(cfg)
}
