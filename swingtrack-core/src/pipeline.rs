//! Per-symbol pipeline composition: detector → filter → estimator → scanner.
//!
//! `analyze_symbol` is pure: it reads one symbol's bars and returns the
//! finalized inflections for that symbol. Symbols share no state, so callers
//! may run it for many symbols in parallel.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{round4, Bar, Inflection};
use crate::params::PipelineParams;
use crate::swing::{detect_extrema, estimate_targets, filter_alternating, scan_from};

/// How many items survived each stage for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub bars: usize,
    pub dropped_bars: usize,
    pub candidates: usize,
    pub retained: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub inflections: Vec<Inflection>,
    pub counts: StageCounts,
}

impl SymbolAnalysis {
    pub fn is_empty(&self) -> bool {
        self.inflections.is_empty()
    }
}

/// Order bars by date, drop bars that fail `Bar::is_sane` (non-finite or
/// non-positive prices, open or close outside the high/low range) and keep
/// the first bar of any duplicated date. Borrows when the input is already
/// canonical.
pub fn canonical_bars(bars: &[Bar]) -> Cow<'_, [Bar]> {
    let canonical =
        bars.iter().all(Bar::is_sane) && bars.windows(2).all(|w| w[0].date < w[1].date);
    if canonical {
        return Cow::Borrowed(bars);
    }

    let mut owned: Vec<Bar> = bars.iter().filter(|b| b.is_sane()).cloned().collect();
    owned.sort_by_key(|b| b.date);
    owned.dedup_by_key(|b| b.date);
    Cow::Owned(owned)
}

/// Run all four stages for one symbol.
pub fn analyze_symbol(
    symbol: &str,
    bars: &[Bar],
    params: &PipelineParams,
    updated_at: NaiveDateTime,
) -> SymbolAnalysis {
    let input_len = bars.len();
    let bars = canonical_bars(bars);
    let mut counts = StageCounts {
        bars: bars.len(),
        dropped_bars: input_len - bars.len(),
        ..StageCounts::default()
    };

    let candidates = detect_extrema(&bars, params.half_window);
    counts.candidates = candidates.len();

    let swings = filter_alternating(candidates, params.min_change_percent);
    counts.retained = swings.len();

    let targets = estimate_targets(&swings, params);

    let inflections: Vec<Inflection> = swings
        .iter()
        .zip(&targets)
        .map(|(swing, target)| Inflection {
            symbol: symbol.to_string(),
            date: swing.date,
            kind: swing.kind,
            price: round4(swing.price),
            close: round4(swing.close),
            target_change: Some(target.target_change),
            target_price: Some(target.target_price),
            days_to_target: scan_from(&bars, swing.bar_index, swing.kind, target.target_price),
            last_updated: updated_at,
        })
        .collect();

    counts.resolved = inflections.iter().filter(|i| i.is_resolved()).count();

    SymbolAnalysis {
        symbol: symbol.to_string(),
        inflections,
        counts,
    }
}
