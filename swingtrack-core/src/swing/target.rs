//! Target estimator: expected move for each inflection, learned from the
//! symbol's own prior swings.
//!
//! For inflection `idx` of kind K on date D:
//! 1. Prior history: earlier inflections of kind K dated within
//!    `[D - history_window_days, D)`.
//! 2. For each prior P, the swing that followed it is P's next inflection of
//!    the opposite kind, provided it sits strictly before `idx`. The move is
//!    `(next - P) / P` for lows and `|(next - P) / P|` for highs.
//! 3. target_change = mean of those moves, or the fallback when there are none.
//!
//! Only positions `< idx` are read, so an estimate never depends on later
//! inflections.

use super::Extremum;
use crate::domain::{round4, InflectionKind};
use crate::params::{days_before, PipelineParams};
use serde::{Deserialize, Serialize};

/// Stage 3 output for one inflection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetEstimate {
    /// Rounded target change (fraction).
    pub target_change: f64,
    /// Rounded absolute target price derived from the rounded close.
    pub target_price: f64,
    /// Number of prior swings averaged; 0 means the fallback was used.
    pub history_points: usize,
}

/// "Next inflection of kind K strictly after position i", precomputed for
/// an alternating sequence in one backward pass.
#[derive(Debug, Clone, Default)]
pub struct NextOfKind {
    next_high: Vec<Option<usize>>,
    next_low: Vec<Option<usize>>,
}

impl NextOfKind {
    pub fn build(swings: &[Extremum]) -> Self {
        let n = swings.len();
        let mut next_high = vec![None; n];
        let mut next_low = vec![None; n];
        let mut upcoming_high = None;
        let mut upcoming_low = None;

        for i in (0..n).rev() {
            next_high[i] = upcoming_high;
            next_low[i] = upcoming_low;
            match swings[i].kind {
                InflectionKind::High => upcoming_high = Some(i),
                InflectionKind::Low => upcoming_low = Some(i),
            }
        }

        Self { next_high, next_low }
    }

    pub fn after(&self, index: usize, kind: InflectionKind) -> Option<usize> {
        let table = match kind {
            InflectionKind::High => &self.next_high,
            InflectionKind::Low => &self.next_low,
        };
        table.get(index).copied().flatten()
    }
}

/// Fractional move from a prior inflection to the swing that followed it.
///
/// `None` when the prior price is zero or either price is not finite; such
/// points are missing history rather than errors.
pub fn swing_move(kind: InflectionKind, from: f64, to: f64) -> Option<f64> {
    if from == 0.0 || !from.is_finite() || !to.is_finite() {
        return None;
    }
    let ratio = (to - from) / from;
    Some(match kind {
        InflectionKind::Low => ratio,
        InflectionKind::High => ratio.abs(),
    })
}

/// Raw (unrounded) target change for position `idx`, with the number of
/// history points it averaged.
pub fn target_change_at(
    swings: &[Extremum],
    next: &NextOfKind,
    idx: usize,
    params: &PipelineParams,
) -> (f64, usize) {
    let current = &swings[idx];
    let window_start = days_before(current.date, params.history_window_days);
    let earlier = &swings[..idx];
    let first_in_window = earlier.partition_point(|s| s.date < window_start);
    let opposite = current.kind.opposite();

    let mut total = 0.0;
    let mut count = 0usize;
    for (p_idx, prior) in earlier.iter().enumerate().skip(first_in_window) {
        if prior.kind != current.kind {
            continue;
        }
        let Some(follow_idx) = next.after(p_idx, opposite).filter(|&j| j < idx) else {
            continue;
        };
        if let Some(change) = swing_move(prior.kind, prior.price, swings[follow_idx].price) {
            total += change;
            count += 1;
        }
    }

    if count == 0 {
        (params.fallback_target_change, 0)
    } else {
        (total / count as f64, count)
    }
}

/// Estimate targets for every inflection of an alternating sequence.
///
/// The returned vector is parallel to `swings`.
pub fn estimate_targets(swings: &[Extremum], params: &PipelineParams) -> Vec<TargetEstimate> {
    let next = NextOfKind::build(swings);
    (0..swings.len())
        .map(|idx| {
            let (raw_change, history_points) = target_change_at(swings, &next, idx, params);
            let target_change = round4(raw_change);
            let close = round4(swings[idx].close);
            TargetEstimate {
                target_change,
                target_price: round4(swings[idx].kind.target_price(close, target_change)),
                history_points,
            }
        })
        .collect()
}
