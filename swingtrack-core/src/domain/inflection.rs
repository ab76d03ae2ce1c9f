//! Inflection: a retained local price extreme and its target tracking state.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which side of the price path an extreme sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InflectionKind {
    High,
    Low,
}

impl InflectionKind {
    pub fn opposite(self) -> Self {
        match self {
            InflectionKind::High => InflectionKind::Low,
            InflectionKind::Low => InflectionKind::High,
        }
    }

    /// Storage label (`"high"` / `"low"`).
    pub fn as_str(self) -> &'static str {
        match self {
            InflectionKind::High => "high",
            InflectionKind::Low => "low",
        }
    }

    /// True when `candidate` is strictly more extreme than `incumbent`:
    /// a higher high or a lower low.
    pub fn is_more_extreme(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            InflectionKind::High => candidate > incumbent,
            InflectionKind::Low => candidate < incumbent,
        }
    }

    /// Absolute price the move is expected to reach from `close`.
    ///
    /// Lows expect a rebound (`close * (1 + change)`), highs a pullback
    /// (`close * (1 - change)`).
    pub fn target_price(self, close: f64, target_change: f64) -> f64 {
        match self {
            InflectionKind::Low => close * (1.0 + target_change),
            InflectionKind::High => close * (1.0 - target_change),
        }
    }
}

impl fmt::Display for InflectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown inflection kind '{0}' (expected 'high' or 'low')")]
pub struct ParseKindError(pub String);

impl FromStr for InflectionKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(InflectionKind::High),
            "low" => Ok(InflectionKind::Low),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

/// Round to four fractional digits, the persisted price precision.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// One persisted inflection row. At most one per (symbol, date).
///
/// `target_change`, `target_price` and `days_to_target` are `None` until the
/// corresponding stage has run; `days_to_target` also stays `None` when the
/// target has not been reached within the available bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inflection {
    pub symbol: String,
    pub date: NaiveDate,
    pub kind: InflectionKind,
    /// The high (for `High`) or low (for `Low`) that made this bar an extreme.
    pub price: f64,
    pub close: f64,
    pub target_change: Option<f64>,
    pub target_price: Option<f64>,
    pub days_to_target: Option<u32>,
    pub last_updated: NaiveDateTime,
}

impl Inflection {
    pub fn is_resolved(&self) -> bool {
        self.days_to_target.is_some()
    }

    /// Target price as stored, or derived from close and target change when
    /// only the latter is known.
    pub fn effective_target_price(&self) -> Option<f64> {
        self.target_price.or_else(|| {
            self.target_change
                .map(|change| round4(self.kind.target_price(self.close, change)))
        })
    }
}
