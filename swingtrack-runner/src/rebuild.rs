//! Rebuild batch driver: recompute every tracked symbol's inflections.
//!
//! Phases:
//! 1. Read the watch list
//! 2. Clear existing inflection rows for that symbol set
//! 3. Load each symbol's bars in `[as_of - bar_lookback_days, as_of]`
//! 4. Analyze symbols (optionally on the rayon pool; symbols share no state)
//! 5. Write each symbol in its own transaction
//!
//! Only phases 1 and 2 abort the batch. Everything after is recorded as a
//! per-symbol outcome so one bad symbol never stops the rest.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use swingtrack_core::domain::Bar;
use swingtrack_core::fingerprint::{BarsHash, ParamsHash};
use swingtrack_core::pipeline::StageCounts;
use swingtrack_core::{analyze_symbol, days_before, ParamsError, PipelineParams, SymbolAnalysis};

use crate::config::DEFAULT_BAR_LOOKBACK_DAYS;
use crate::store::{BarSource, InflectionStore, StoreError, WatchList};

/// Current schema version for serialized reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum RebuildError {
    #[error("invalid pipeline parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("bar_lookback_days must be >= 1, got {0}")]
    InvalidLookback(i64),

    #[error("read watch list: {0}")]
    WatchList(#[source] StoreError),

    #[error("clear inflections: {0}")]
    Clear(#[source] StoreError),

    #[error("read pending inflections: {0}")]
    Pending(#[source] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildOptions {
    /// Last calendar day of the bar window.
    pub as_of: NaiveDate,
    pub bar_lookback_days: i64,
    pub parallel: bool,
    /// Stamp written to every row's `last_updated`.
    pub updated_at: NaiveDateTime,
}

impl RebuildOptions {
    pub fn new(updated_at: NaiveDateTime) -> Self {
        Self {
            as_of: updated_at.date(),
            bar_lookback_days: DEFAULT_BAR_LOOKBACK_DAYS,
            parallel: true,
            updated_at,
        }
    }

    /// First day of the bar window.
    pub fn window_start(&self) -> NaiveDate {
        days_before(self.as_of, self.bar_lookback_days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No bars in the lookback window.
    NoBars,
    /// Bars were present but no inflection survived filtering.
    NoInflections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    LoadBars,
    WriteInflections,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Written { rows: usize },
    Skipped { reason: SkipReason },
    Failed { stage: FailureStage, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolReport {
    pub outcome: SymbolOutcome,
    /// Fingerprint of the bar window the symbol was analyzed on.
    pub bars_hash: Option<BarsHash>,
    #[serde(default)]
    pub counts: StageCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub as_of: NaiveDate,
    pub window_start: NaiveDate,
    pub params: PipelineParams,
    pub params_hash: ParamsHash,
    pub rows_cleared: usize,
    pub rows_written: usize,
    pub symbols: BTreeMap<String, SymbolReport>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RebuildReport {
    pub fn written_count(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Written { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Failed { .. }))
    }

    /// True when the batch wrote nothing at all.
    pub fn is_zero_progress(&self) -> bool {
        self.rows_written == 0
    }

    fn count(&self, pred: impl Fn(&SymbolOutcome) -> bool) -> usize {
        self.symbols.values().filter(|r| pred(&r.outcome)).count()
    }
}

/// Rebuild inflections for every tracked symbol.
pub fn rebuild<S>(
    store: &mut S,
    params: &PipelineParams,
    opts: &RebuildOptions,
) -> Result<RebuildReport, RebuildError>
where
    S: BarSource + WatchList + InflectionStore,
{
    params.validate()?;
    if opts.bar_lookback_days < 1 {
        return Err(RebuildError::InvalidLookback(opts.bar_lookback_days));
    }

    let mut symbols = store.tracked_symbols().map_err(RebuildError::WatchList)?;
    symbols.sort();
    symbols.dedup();

    let window_start = opts.window_start();
    info!(
        symbols = symbols.len(),
        %window_start,
        as_of = %opts.as_of,
        "starting rebuild"
    );

    let rows_cleared = store.clear(&symbols).map_err(RebuildError::Clear)?;
    info!(rows_cleared, "cleared existing inflections");

    let mut report = RebuildReport {
        schema_version: SCHEMA_VERSION,
        as_of: opts.as_of,
        window_start,
        params: params.clone(),
        params_hash: ParamsHash::of(params),
        rows_cleared,
        rows_written: 0,
        symbols: BTreeMap::new(),
    };

    // Load sequentially; the store handle is not shared across threads.
    let mut loaded: Vec<(String, Vec<Bar>)> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        match store.bars_between(&symbol, window_start, opts.as_of) {
            Ok(bars) if bars.is_empty() => {
                warn!(%symbol, since = %window_start, until = %opts.as_of, "no bars in window, skipping");
                report.symbols.insert(
                    symbol,
                    SymbolReport {
                        outcome: SymbolOutcome::Skipped {
                            reason: SkipReason::NoBars,
                        },
                        bars_hash: None,
                        counts: StageCounts::default(),
                    },
                );
            }
            Ok(bars) => loaded.push((symbol, bars)),
            Err(e) => {
                error!(%symbol, error = %e, "failed to load bars");
                report.symbols.insert(
                    symbol,
                    SymbolReport {
                        outcome: SymbolOutcome::Failed {
                            stage: FailureStage::LoadBars,
                            error: e.to_string(),
                        },
                        bars_hash: None,
                        counts: StageCounts::default(),
                    },
                );
            }
        }
    }

    let analyze = |(symbol, bars): &(String, Vec<Bar>)| {
        let analysis = analyze_symbol(symbol, bars, params, opts.updated_at);
        (analysis, BarsHash::of(symbol, bars))
    };
    let analyses: Vec<(SymbolAnalysis, BarsHash)> = if opts.parallel {
        loaded.par_iter().map(analyze).collect()
    } else {
        loaded.iter().map(analyze).collect()
    };

    for (analysis, bars_hash) in analyses {
        let counts = analysis.counts;
        debug!(
            symbol = %analysis.symbol,
            bars = counts.bars,
            dropped_bars = counts.dropped_bars,
            candidates = counts.candidates,
            retained = counts.retained,
            resolved = counts.resolved,
            "analyzed symbol"
        );

        let outcome = if analysis.is_empty() {
            warn!(symbol = %analysis.symbol, bars = counts.bars, "no inflections, skipping");
            SymbolOutcome::Skipped {
                reason: SkipReason::NoInflections,
            }
        } else {
            match store.replace_symbol(&analysis.symbol, &analysis.inflections) {
                Ok(rows) => {
                    report.rows_written += rows;
                    SymbolOutcome::Written { rows }
                }
                Err(e) => {
                    error!(symbol = %analysis.symbol, error = %e, "failed to write inflections");
                    SymbolOutcome::Failed {
                        stage: FailureStage::WriteInflections,
                        error: e.to_string(),
                    }
                }
            }
        };

        report.symbols.insert(
            analysis.symbol,
            SymbolReport {
                outcome,
                bars_hash: Some(bars_hash),
                counts,
            },
        );
    }

    info!(
        rows_written = report.rows_written,
        written = report.written_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        "rebuild complete"
    );
    if report.is_zero_progress() {
        warn!("rebuild wrote no rows");
    }

    Ok(report)
}
