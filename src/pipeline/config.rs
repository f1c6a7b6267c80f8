//! Pipeline configuration

use crate::error::{ForecastError, Result};
use crate::preprocessing::RescaleMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the sales pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the five transform artifacts
    pub artifact_dir: PathBuf,

    /// XGBoost model in JSON format
    pub model_path: PathBuf,

    /// Whether transforms are applied frozen or refit per batch
    pub rescale_mode: RescaleMode,

    /// Competition distance imputed when no record in a batch has one.
    /// Without it such a batch is rejected.
    pub competition_distance_fallback: Option<f64>,

    /// Require the model's stored feature names to match the feature order
    pub validate_feature_names: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("rescaling"),
            model_path: PathBuf::from("model/xgb_model_tuned.json"),
            rescale_mode: RescaleMode::Frozen,
            competition_distance_fallback: None,
            validate_feature_names: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the artifact directory
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Builder method to set the model path
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    /// Builder method to set the rescale mode
    pub fn with_rescale_mode(mut self, mode: RescaleMode) -> Self {
        self.rescale_mode = mode;
        self
    }

    /// Builder method to set the competition distance fallback
    pub fn with_distance_fallback(mut self, distance: f64) -> Self {
        self.competition_distance_fallback = Some(distance);
        self
    }

    /// Builder method to toggle feature name validation
    pub fn with_feature_name_validation(mut self, enabled: bool) -> Self {
        self.validate_feature_names = enabled;
        self
    }

    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| ForecastError::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(d) = self.competition_distance_fallback {
            if !d.is_finite() || d < 0.0 {
                return Err(ForecastError::ConfigError(format!(
                    "competition_distance_fallback must be a non-negative number, got {}",
                    d
                )));
            }
        }
        Ok(())
    }
}
