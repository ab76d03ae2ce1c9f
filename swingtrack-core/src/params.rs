//! Pipeline parameters shared by all four stages.
//!
//! Unit convention: `min_change_percent` is a percentage (5.0 == 5%), while
//! target changes, including the fallback, are fractions (0.05 == 5%).

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_HALF_WINDOW: usize = 2;
pub const DEFAULT_MIN_CHANGE_PERCENT: f64 = 5.0;
pub const DEFAULT_HISTORY_WINDOW_DAYS: i64 = 450;
pub const DEFAULT_FALLBACK_TARGET_CHANGE: f64 = 0.05;

/// Invalid parameter values rejected before a run starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("half_window must be >= 1")]
    ZeroHalfWindow,

    #[error("min_change_percent must be finite and >= 0, got {0}")]
    InvalidMinChange(f64),

    #[error("history_window_days must be >= 0, got {0}")]
    NegativeHistoryWindow(i64),

    #[error("fallback_target_change must be finite and >= 0, got {0}")]
    InvalidFallback(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Bars on each side of the centre bar; the window spans `2 * half_window + 1` bars.
    pub half_window: usize,
    /// Minimum swing between opposite-kind inflections, in percent of the prior price.
    pub min_change_percent: f64,
    /// Calendar days of same-kind history the target estimator looks back over.
    pub history_window_days: i64,
    /// Target change (fraction) used when no usable history exists.
    pub fallback_target_change: f64,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            half_window: DEFAULT_HALF_WINDOW,
            min_change_percent: DEFAULT_MIN_CHANGE_PERCENT,
            history_window_days: DEFAULT_HISTORY_WINDOW_DAYS,
            fallback_target_change: DEFAULT_FALLBACK_TARGET_CHANGE,
        }
    }
}

impl PipelineParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.half_window == 0 {
            return Err(ParamsError::ZeroHalfWindow);
        }
        if !self.min_change_percent.is_finite() || self.min_change_percent < 0.0 {
            return Err(ParamsError::InvalidMinChange(self.min_change_percent));
        }
        if self.history_window_days < 0 {
            return Err(ParamsError::NegativeHistoryWindow(self.history_window_days));
        }
        if !self.fallback_target_change.is_finite() || self.fallback_target_change < 0.0 {
            return Err(ParamsError::InvalidFallback(self.fallback_target_change));
        }
        Ok(())
    }

    /// Minimum number of bars for the detector to emit any candidate.
    pub fn min_bars(&self) -> usize {
        2 * self.half_window + 1
    }
}

/// `date` minus `days` calendar days. A window reaching past the earliest
/// representable date starts at `NaiveDate::MIN`.
pub fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|span| date.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN)
}
