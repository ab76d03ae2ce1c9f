//! Horizon scanner: trading days until a target price is first crossed.
//!
//! Low inflections look for the first bar with `high >= target`, high
//! inflections for the first bar with `low <= target`. The count is inclusive
//! of both the inflection bar and the matching bar. `None` means the target
//! has not been reached within the available bars.

use crate::domain::{Bar, InflectionKind};
use chrono::NaiveDate;

fn crosses(kind: InflectionKind, bar: &Bar, target_price: f64) -> bool {
    match kind {
        InflectionKind::Low => bar.high >= target_price,
        InflectionKind::High => bar.low <= target_price,
    }
}

/// Scan forward from `start_index` (the inflection's own bar).
pub fn scan_from(
    bars: &[Bar],
    start_index: usize,
    kind: InflectionKind,
    target_price: f64,
) -> Option<u32> {
    if !target_price.is_finite() {
        return None;
    }
    bars.get(start_index..)?
        .iter()
        .position(|bar| crosses(kind, bar, target_price))
        .and_then(|offset| u32::try_from(offset + 1).ok())
}

/// Scan bars dated on or after `date`. `bars` must be ordered by date.
pub fn days_to_target(
    bars: &[Bar],
    date: NaiveDate,
    kind: InflectionKind,
    target_price: f64,
) -> Option<u32> {
    let start = bars.partition_point(|b| b.date < date);
    scan_from(bars, start, kind, target_price)
}
