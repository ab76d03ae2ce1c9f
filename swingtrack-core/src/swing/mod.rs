//! The four stages of the inflection pipeline.
//!
//! Data flows strictly forward:
//! 1. `extrema` flags bars that are the high/low of a centred window.
//! 2. `alternation` merges same-kind runs and drops sub-threshold swings.
//! 3. `target` estimates each inflection's expected move from prior swings.
//! 4. `horizon` counts trading days until that move is realised.

pub mod alternation;
pub mod extrema;
pub mod horizon;
pub mod target;

pub use alternation::filter_alternating;
pub use extrema::detect_extrema;
pub use horizon::{days_to_target, scan_from};
pub use target::{estimate_targets, NextOfKind, TargetEstimate};

use crate::domain::InflectionKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A local extreme flowing through stages 1–3.
///
/// `bar_index` addresses the bar series the extreme was detected in, so the
/// horizon scan can start without searching by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub kind: InflectionKind,
    pub date: NaiveDate,
    pub price: f64,
    pub close: f64,
    pub bar_index: usize,
}

/// Build bars from `(high, low, close)` triples, one calendar day apart.
#[cfg(test)]
pub fn make_bars(data: &[(f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(high, low, close))| Bar {
            symbol: "TEST".to_string(),
            date: base_date + chrono::Duration::days(i as i64),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        })
        .collect()
}

/// Bars whose high, low and close all equal the given close.
#[cfg(test)]
pub fn flat_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    let triples: Vec<(f64, f64, f64)> = closes.iter().map(|&c| (c, c, c)).collect();
    make_bars(&triples)
}

/// Shorthand for building an extremum in stage tests.
#[cfg(test)]
pub fn ext(kind: InflectionKind, day: i64, price: f64) -> Extremum {
    Extremum {
        kind,
        date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap() + chrono::Duration::days(day),
        price,
        close: price,
        bar_index: day as usize,
    }
}
