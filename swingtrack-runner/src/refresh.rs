//! Pending resolution: re-scan unresolved inflections as new bars arrive.
//!
//! Rows whose days-to-target is already known are never read or written.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use swingtrack_core::domain::{round4, Inflection};
use swingtrack_core::pipeline::canonical_bars;
use swingtrack_core::swing::days_to_target;

use crate::rebuild::RebuildError;
use crate::store::{BarSource, InflectionStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Pending rows read from the store.
    pub examined: usize,
    /// Rows whose target price was derived during this pass.
    pub target_prices_filled: usize,
    /// Rows that reached their target and now have a day count.
    pub resolved: usize,
    /// Rows still waiting for their target.
    pub still_pending: usize,
    /// Rows that could not be processed (no target inputs or a store error).
    pub failed: usize,
}

/// Resolve every pending inflection against the bars currently stored.
pub fn resolve_pending<S>(store: &mut S, updated_at: NaiveDateTime) -> Result<RefreshReport, RebuildError>
where
    S: BarSource + InflectionStore,
{
    let pending = store.pending().map_err(RebuildError::Pending)?;
    let mut report = RefreshReport {
        examined: pending.len(),
        ..RefreshReport::default()
    };
    info!(pending = pending.len(), "resolving pending inflections");

    let mut by_symbol: BTreeMap<String, Vec<Inflection>> = BTreeMap::new();
    for inflection in pending {
        by_symbol
            .entry(inflection.symbol.clone())
            .or_default()
            .push(inflection);
    }

    for (symbol, rows) in by_symbol {
        let Some(earliest) = rows.iter().map(|r| r.date).min() else {
            continue;
        };
        let bars = match store.bars_since(&symbol, earliest) {
            Ok(bars) => bars,
            Err(e) => {
                error!(%symbol, error = %e, "failed to load bars");
                report.failed += rows.len();
                continue;
            }
        };
        let bars = canonical_bars(&bars);

        for row in rows {
            let Some(target_price) = row.effective_target_price() else {
                warn!(%symbol, date = %row.date, "no target price or target change, skipping");
                report.failed += 1;
                continue;
            };
            let filled = row.target_price.is_none();
            let days = days_to_target(&bars, row.date, row.kind, target_price);

            if !filled && days.is_none() {
                report.still_pending += 1;
                continue;
            }

            match store.record_resolution(&symbol, row.date, round4(target_price), days, updated_at) {
                Ok(_) => {
                    debug!(%symbol, date = %row.date, target_price, ?days, "updated inflection");
                    if filled {
                        report.target_prices_filled += 1;
                    }
                    if days.is_some() {
                        report.resolved += 1;
                    } else {
                        report.still_pending += 1;
                    }
                }
                Err(e) => {
                    error!(%symbol, date = %row.date, error = %e, "failed to record resolution");
                    report.failed += 1;
                }
            }
        }
    }

    info!(
        examined = report.examined,
        target_prices_filled = report.target_prices_filled,
        resolved = report.resolved,
        still_pending = report.still_pending,
        failed = report.failed,
        "refresh complete"
    );
    Ok(report)
}
