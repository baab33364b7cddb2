use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{MAX_TRACK_VOLUME, MIN_CLIP_SEC};
use crate::snap::GRID_STEP_SEC;
use crate::time_scale::{
    BASE_PIXELS_PER_SECOND, BUTTON_ZOOM_FACTOR, MAX_ZOOM, MIN_ZOOM, WHEEL_ZOOM_FACTOR,
};

const CONFIG_DIR: &str = "Beatline";
const CONFIG_FILE: &str = "timeline.json";

/// Pointer travel, in pixels per axis, below which a clip drag counts as a click.
pub const CLICK_THRESHOLD_PX: f64 = 3.0;

/// Width of the lane header column left of the time axis.
pub const DEFAULT_LABEL_WIDTH: f64 = 160.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid timeline config: {0}")]
    Invalid(String),
}

/// Tunables of the timeline. Every field falls back to the stock value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub base_pixels_per_second: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub wheel_zoom_factor: f64,
    pub button_zoom_factor: f64,
    pub grid_step_sec: f64,
    pub min_clip_sec: f64,
    pub click_threshold_px: f64,
    pub label_width: f64,
    pub max_volume: f32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            base_pixels_per_second: BASE_PIXELS_PER_SECOND,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            wheel_zoom_factor: WHEEL_ZOOM_FACTOR,
            button_zoom_factor: BUTTON_ZOOM_FACTOR,
            grid_step_sec: GRID_STEP_SEC,
            min_clip_sec: MIN_CLIP_SEC,
            click_threshold_px: CLICK_THRESHOLD_PX,
            label_width: DEFAULT_LABEL_WIDTH,
            max_volume: MAX_TRACK_VOLUME,
        }
    }
}

impl TimelineConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_str(&contents)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let config: TimelineConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the per-user config, returning defaults if it is missing or broken.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::from_path(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(?err, path = %path.display(), "failed to read timeline config");
                Self::default()
            }
        }
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("base_pixels_per_second", self.base_pixels_per_second),
            ("min_zoom", self.min_zoom),
            ("grid_step_sec", self.grid_step_sec),
            ("min_clip_sec", self.min_clip_sec),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if !(self.max_zoom >= self.min_zoom) {
            return Err(ConfigError::Invalid(
                "max_zoom must not be below min_zoom".into(),
            ));
        }
        if !(self.wheel_zoom_factor > 1.0 && self.button_zoom_factor > 1.0) {
            return Err(ConfigError::Invalid("zoom factors must exceed 1".into()));
        }
        if !(self.click_threshold_px >= 0.0 && self.label_width >= 0.0) {
            return Err(ConfigError::Invalid(
                "click threshold and label width must not be negative".into(),
            ));
        }
        if !(self.max_volume > 0.0) {
            return Err(ConfigError::Invalid("max_volume must be positive".into()));
        }
        Ok(())
    }
}

fn config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir()?;
    base.push(CONFIG_DIR);
    base.push(CONFIG_FILE);
    Some(base)
}
