//! Alternation filter: reduce raw extrema to a strictly alternating
//! high/low sequence.
//!
//! Walking candidates in date order with one retained inflection at a time:
//! - same kind as the retained one: keep the more extreme, drop the other;
//! - opposite kind: append only if the move from the retained price is at
//!   least `min_change_percent` percent, otherwise drop it as noise.
//!
//! The first candidate always seeds the sequence.

use super::Extremum;

/// Percentage move from `reference` to `price`, or `None` when the reference
/// price cannot be divided by.
pub fn swing_percent(reference: f64, price: f64) -> Option<f64> {
    if reference == 0.0 || !reference.is_finite() || !price.is_finite() {
        return None;
    }
    Some((price - reference).abs() / reference * 100.0)
}

pub fn filter_alternating(mut candidates: Vec<Extremum>, min_change_percent: f64) -> Vec<Extremum> {
    candidates.sort_by_key(|c| c.date);

    let mut retained: Vec<Extremum> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(last) = retained.last_mut() else {
            retained.push(candidate);
            continue;
        };

        if candidate.kind == last.kind {
            if candidate.kind.is_more_extreme(candidate.price, last.price) {
                *last = candidate;
            }
            continue;
        }

        // A zero reference makes the swing undefined; treat it as noise.
        match swing_percent(last.price, candidate.price) {
            Some(change) if change >= min_change_percent => retained.push(candidate),
            _ => {}
        }
    }

    retained
}
