// SPDX-License-Identifier: GPL-3.0-only

use crate::constants;
use crate::errors::{AppError, AppResult};
use crate::geometry::Size;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Screen bounds used for the preview layer frame and scan region math
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
}

impl ScreenConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Both sides must be finite and positive; the scan region is normalized
    /// against them
    pub fn validate(&self) -> Result<(), String> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.width) && valid(self.height) {
            Ok(())
        } else {
            Err(format!(
                "screen size must be positive, got {}x{}",
                self.width, self.height
            ))
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: constants::DEFAULT_SCREEN_WIDTH,
            height: constants::DEFAULT_SCREEN_HEIGHT,
        }
    }
}

/// Scan session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Outline detected symbols on the preview by default
    pub draw_overlay: bool,
    /// Maximum frame dimension for live detection (frames are downscaled)
    pub max_dimension: u32,
    /// Pending detection events before new events are dropped
    pub event_queue_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            draw_overlay: false,
            max_dimension: constants::LIVE_DETECTION_MAX_DIMENSION,
            event_queue_depth: constants::DEFAULT_EVENT_QUEUE_DEPTH,
        }
    }
}

/// QR generation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Pixels per module
    pub definition: f32,
    /// Overlay size as a fraction of the symbol size
    pub overlay_scale: f32,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            definition: constants::DEFAULT_DEFINITION,
            overlay_scale: constants::DEFAULT_OVERLAY_SCALE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub screen: ScreenConfig,
    pub scan: ScanConfig,
    pub generate: GenerateConfig,
}

impl Config {
    /// Default location: `<config dir>/qrscan/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(constants::APP_ID).join("config.json"))
    }

    /// Load the configuration from the default location
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            debug!("No config directory available, using defaults");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load the configuration from a specific file
    ///
    /// Returns the defaults if the file does not exist.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        config
            .validate()
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Check the values serde cannot
    pub fn validate(&self) -> AppResult<()> {
        self.screen.validate().map_err(AppError::Config)
    }

    /// Write the configuration as pretty-printed JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_json::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;

        debug!(path = %path.display(), "Saved config");
        Ok(())
    }
}
