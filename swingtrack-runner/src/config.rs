//! TOML configuration for the batch jobs.
//!
//! Every section and field is optional; missing values take the pipeline
//! defaults. Example:
//!
//! ```toml
//! [store]
//! path = "stocks.db"
//!
//! [filter]
//! min_change_percent = 7.5
//!
//! [batch]
//! parallel = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use swingtrack_core::params::{
    DEFAULT_FALLBACK_TARGET_CHANGE, DEFAULT_HALF_WINDOW, DEFAULT_HISTORY_WINDOW_DAYS,
    DEFAULT_MIN_CHANGE_PERCENT,
};
use swingtrack_core::{ParamsError, PipelineParams};
use thiserror::Error;

pub const DEFAULT_STORE_PATH: &str = "stocks.db";
pub const DEFAULT_BAR_LOOKBACK_DAYS: i64 = 450;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid pipeline parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("bar_lookback_days must be >= 1, got {0}")]
    InvalidLookback(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSection {
    pub half_window: usize,
}

impl Default for DetectorSection {
    fn default() -> Self {
        Self {
            half_window: DEFAULT_HALF_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    /// Percent, not a fraction.
    pub min_change_percent: f64,
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            min_change_percent: DEFAULT_MIN_CHANGE_PERCENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorSection {
    pub history_window_days: i64,
    /// Fraction, not a percent.
    pub fallback_target_change: f64,
}

impl Default for EstimatorSection {
    fn default() -> Self {
        Self {
            history_window_days: DEFAULT_HISTORY_WINDOW_DAYS,
            fallback_target_change: DEFAULT_FALLBACK_TARGET_CHANGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    /// Calendar days of bars loaded before the as-of date.
    pub bar_lookback_days: i64,
    /// Analyze symbols on the rayon pool.
    pub parallel: bool,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            bar_lookback_days: DEFAULT_BAR_LOOKBACK_DAYS,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    pub store: StoreSection,
    pub detector: DetectorSection,
    pub filter: FilterSection,
    pub estimator: EstimatorSection,
    pub batch: BatchSection,
}

impl SwingConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_pipeline_params().validate()?;
        if self.batch.bar_lookback_days < 1 {
            return Err(ConfigError::InvalidLookback(self.batch.bar_lookback_days));
        }
        Ok(())
    }

    pub fn to_pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            half_window: self.detector.half_window,
            min_change_percent: self.filter.min_change_percent,
            history_window_days: self.estimator.history_window_days,
            fallback_target_change: self.estimator.fallback_target_change,
        }
    }
}
