use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Brush spacing must be positive, got {0}")]
    InvalidSpacing(f64),

    #[error("Brush size range is empty: min {min} > max {max}")]
    InvalidBrushRange { min: u32, max: u32 },

    #[error("Checker size must be non-zero")]
    InvalidCheckerSize,

    #[error("Mask opacity {0} is outside 0..=1")]
    InvalidOpacity(f32),
}

/// Tunables for one canvas instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Minimum canvas-space distance between committed stroke points.
    pub brush_spacing: f64,
    pub min_brush_size: u32,
    pub max_brush_size: u32,
    pub default_brush_size: u32,
    pub invert_scroll_direction: bool,
    pub global_mask_opacity: f32,
    /// Quiet period before a preview surface picks up changes.
    pub preview_debounce_ms: u64,
    /// Edge length of one background checker cell.
    pub checker_size: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            brush_spacing: 20.0,
            min_brush_size: 1,
            max_brush_size: 500,
            default_brush_size: 100,
            invert_scroll_direction: false,
            global_mask_opacity: 0.3,
            preview_debounce_ms: 300,
            checker_size: 16,
        }
    }
}

impl CanvasConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.brush_spacing > 0.0 && self.brush_spacing.is_finite()) {
            return Err(ConfigError::InvalidSpacing(self.brush_spacing));
        }
        if self.min_brush_size > self.max_brush_size {
            return Err(ConfigError::InvalidBrushRange {
                min: self.min_brush_size,
                max: self.max_brush_size,
            });
        }
        if self.checker_size == 0 {
            return Err(ConfigError::InvalidCheckerSize);
        }
        if !(0.0..=1.0).contains(&self.global_mask_opacity) {
            return Err(ConfigError::InvalidOpacity(self.global_mask_opacity));
        }
        Ok(())
    }

    /// Parse and validate; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Default brush size, pulled into the allowed range.
    pub fn initial_brush_size(&self) -> u32 {
        self.default_brush_size
            .clamp(self.min_brush_size, self.max_brush_size)
    }
}
