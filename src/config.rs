//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/spotcast/config.json`.
//! Every section is optional; a minimal `{}` file is valid and all values
//! fall back to their compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "projection": {
//!     "rotation_interval_ms": 5000,
//!     "refresh_interval_ms": 120000,
//!     "scale_origin": false
//!   },
//!   "feed": { "base_url": "https://images.drivebc.ca/webcam/api/v1/webcams" },
//!   "catalog": { "path": "/etc/spotcast/ferries.json" },
//!   "displays": [
//!     { "name": "DP-1", "x": 0, "y": 0, "width": 3840, "height": 2160, "dpi": 144.0 }
//!   ]
//! }
//! ```
//!
//! Interval changes made at runtime are written back to the same file, so
//! they survive a restart.
//!
//! Instead of a fixed `displays` list, `displays_file` may point at a JSON
//! file that is re-read whenever the display configuration changes.

use crate::command::DisplayInfo;
use crate::feed::DEFAULT_BASE_URL;
use crate::host::DisplaySource;
use crate::projector::ProjectorSettings;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Timer and placement settings.
    #[serde(default)]
    pub projection: ProjectionConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Fixed display list.
    #[serde(default)]
    pub displays: Vec<DisplayInfo>,

    /// JSON display list re-read on every enumeration.  Takes precedence
    /// over `displays`.
    #[serde(default)]
    pub displays_file: Option<PathBuf>,
}

/// Timer and placement settings.
///
/// Intervals are in **milliseconds**.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// How long each image stays up in rotating mode (ms).
    pub rotation_interval_ms: u64,
    /// How often images are re-fetched (ms).
    pub refresh_interval_ms: u64,
    /// Also divide the window origin by the display scale factor.
    pub scale_origin: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            rotation_interval_ms: 3_000,
            refresh_interval_ms: 300_000,
            scale_origin: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Image feed base; spot URLs are `{base_url}/{id}/...`.
    pub base_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Location catalog file.  Defaults to `catalog.json` next to the
    /// config file.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config at `path`, falling back to compiled-in defaults.
    ///
    /// A missing file is normal and logged at `info`; a file that exists
    /// but cannot be read or is invalid is logged at `warn`.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(cfg) => {
                info!("loaded config from {}", path.display());
                cfg
            }
            Err(e) if path.exists() => {
                warn!("ignoring invalid config ({}), using defaults", e);
                Self::default()
            }
            Err(_) => {
                info!("no config file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the configuration to `path` as pretty-printed JSON, creating
    /// the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| ConfigError(format!("failed to create {}: {}", dir.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError(format!("failed to encode config: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| ConfigError(format!("failed to write {}: {}", path.display(), e)))
    }

    /// Apply `edit` to the config stored at `path` and write it back.
    ///
    /// A missing file starts from defaults.  An unreadable or invalid file
    /// is left untouched and reported as an error.
    pub fn update(path: &Path, edit: impl FnOnce(&mut Config)) -> Result<(), ConfigError> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        edit(&mut config);
        config.validate()?;
        config.save(path)
    }

    /// Reject settings the timers cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.projection.rotation_interval_ms == 0 || self.projection.refresh_interval_ms == 0 {
            return Err(ConfigError("intervals must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn projector_settings(&self) -> ProjectorSettings {
        ProjectorSettings {
            rotation_interval: Duration::from_millis(self.projection.rotation_interval_ms),
            refresh_interval: Duration::from_millis(self.projection.refresh_interval_ms),
            scale_origin: self.projection.scale_origin,
        }
    }

    pub fn display_source(&self) -> DisplaySource {
        match &self.displays_file {
            Some(path) => DisplaySource::File(path.clone()),
            None => DisplaySource::Static(self.displays.clone()),
        }
    }

    /// The catalog path, resolved against `config_dir` when unset.
    pub fn catalog_path(&self, config_dir: &Path) -> PathBuf {
        self.catalog
            .path
            .clone()
            .unwrap_or_else(|| config_dir.join("catalog.json"))
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
