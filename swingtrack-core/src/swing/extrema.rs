//! Extrema detector: centred rolling high/low window.
//!
//! For every bar `i` with `half_window` bars on each side:
//! - High candidate: high[i] == max(high[i-w..=i+w])
//! - Low candidate:  low[i]  == min(low[i-w..=i+w])
//!
//! The high check wins when a bar satisfies both. Bars within `half_window`
//! positions of either end are never candidates. A window containing a
//! non-finite price has no extreme.

use super::Extremum;
use crate::domain::{Bar, InflectionKind};

/// Scan `bars` (ordered by date) and emit candidates in date order.
pub fn detect_extrema(bars: &[Bar], half_window: usize) -> Vec<Extremum> {
    let n = bars.len();
    let span = 2 * half_window + 1;
    if n < span {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for i in half_window..(n - half_window) {
        let window = &bars[i - half_window..=i + half_window];
        let bar = &bars[i];

        if let Some(max_high) = window_max_high(window) {
            if bar.high == max_high {
                candidates.push(Extremum {
                    kind: InflectionKind::High,
                    date: bar.date,
                    price: bar.high,
                    close: bar.close,
                    bar_index: i,
                });
                continue;
            }
        }

        if let Some(min_low) = window_min_low(window) {
            if bar.low == min_low {
                candidates.push(Extremum {
                    kind: InflectionKind::Low,
                    date: bar.date,
                    price: bar.low,
                    close: bar.close,
                    bar_index: i,
                });
            }
        }
    }

    candidates
}

fn window_max_high(window: &[Bar]) -> Option<f64> {
    let mut max_val = f64::NEG_INFINITY;
    for bar in window {
        if !bar.high.is_finite() {
            return None;
        }
        if bar.high > max_val {
            max_val = bar.high;
        }
    }
    Some(max_val)
}

fn window_min_low(window: &[Bar]) -> Option<f64> {
    let mut min_val = f64::INFINITY;
    for bar in window {
        if !bar.low.is_finite() {
            return None;
        }
        if bar.low < min_val {
            min_val = bar.low;
        }
    }
    Some(min_val)
}
