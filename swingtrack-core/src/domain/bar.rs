//! Bar: one trading day of OHLCV data for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for a single symbol.
///
/// Bars are owned by the external bar store and are immutable once stored.
/// Prices carry four fractional digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any price field is not finite (void bar).
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// True when all prices are positive and open and close lie within
    /// `[low, high]`.
    pub fn is_sane(&self) -> bool {
        let range = self.low..=self.high;
        !self.is_void()
            && self.low > 0.0
            && range.contains(&self.open)
            && range.contains(&self.close)
    }
}
