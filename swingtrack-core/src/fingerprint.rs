//! Input fingerprints: deterministic identification of a run's inputs.
//!
//! - `BarsHash`: content hash of one symbol's bar window.
//! - `ParamsHash`: hash of the pipeline parameters.
//!
//! Two rebuilds with equal fingerprints must persist identical inflections.

use crate::domain::Bar;
use crate::params::PipelineParams;
use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 hash over the dates and OHLCV values of a bar window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarsHash(pub String);

impl BarsHash {
    pub fn of(symbol: &str, bars: &[Bar]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        for bar in bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for BarsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// BLAKE3 hash of the canonical JSON form of `PipelineParams`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamsHash(pub String);

impl ParamsHash {
    pub fn of(params: &PipelineParams) -> Self {
        // json! objects keep their keys sorted, so the text is stable.
        let json = serde_json::json!({
            "half_window": params.half_window,
            "min_change_percent": params.min_change_percent,
            "history_window_days": params.history_window_days,
            "fallback_target_change": params.fallback_target_change,
        });
        Self(blake3::hash(json.to_string().as_bytes()).to_hex().to_string())
    }
}

impl fmt::Display for ParamsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
