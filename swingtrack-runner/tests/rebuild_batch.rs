//! Integration tests for the rebuild batch driver on an in-memory store.

mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::{bar, day, seeded_store, stamp, zigzag};
use swingtrack_core::domain::{Bar, Inflection, InflectionKind};
use swingtrack_core::PipelineParams;
use swingtrack_runner::{
    rebuild, BarSource, FailureStage, InflectionStore, RebuildError, RebuildOptions, SkipReason,
    SqliteStore, StoreError, SymbolOutcome, WatchList,
};

fn opts(parallel: bool) -> RebuildOptions {
    RebuildOptions {
        as_of: day(57),
        bar_lookback_days: 450,
        parallel,
        updated_at: stamp(),
    }
}

/// AAA: 58 zigzag bars (11 inflections). BBB: 40 zigzag bars (7).
/// SHORT: 3 bars. EMPTY: tracked without bars.
fn fixture_store() -> SqliteStore {
    let mut bars = zigzag("AAA", 58);
    bars.extend(zigzag("BBB", 40));
    bars.extend((0..3).map(|i| bar("SHORT", i, 50.0 + i as f64)));
    seeded_store(&["AAA", "BBB", "SHORT", "EMPTY"], &bars)
}

#[test]
fn rebuild_records_every_outcome() {
    let mut store = fixture_store();
    let report = rebuild(&mut store, &PipelineParams::default(), &opts(false)).unwrap();

    assert_eq!(report.rows_written, 18);
    assert_eq!(report.rows_cleared, 0);
    assert_eq!(
        report.symbols["AAA"].outcome,
        SymbolOutcome::Written { rows: 11 }
    );
    assert_eq!(report.symbols["BBB"].outcome, SymbolOutcome::Written { rows: 7 });
    assert_eq!(
        report.symbols["SHORT"].outcome,
        SymbolOutcome::Skipped {
            reason: SkipReason::NoInflections
        }
    );
    assert_eq!(
        report.symbols["EMPTY"].outcome,
        SymbolOutcome::Skipped {
            reason: SkipReason::NoBars
        }
    );
    assert!(report.symbols["EMPTY"].bars_hash.is_none());
    assert!(report.symbols["AAA"].bars_hash.is_some());
    assert!(!report.is_zero_progress());
}

#[test]
fn persisted_rows_alternate_and_carry_targets() {
    let mut store = fixture_store();
    rebuild(&mut store, &PipelineParams::default(), &opts(false)).unwrap();

    let rows = store.inflections_for("AAA").unwrap();
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0].kind, InflectionKind::High);
    assert_eq!(rows[0].date, day(5));
    for pair in rows.windows(2) {
        assert_ne!(pair[0].kind, pair[1].kind);
        assert!(pair[0].date < pair[1].date);
    }
    assert!(rows.iter().all(|r| r.target_price.is_some()));
    assert!(rows.iter().all(|r| r.last_updated == stamp()));

    // The first low has no prior low: 5% fallback from a close of 100.
    let first_low = &rows[1];
    assert_eq!(first_low.date, day(10));
    assert_eq!(first_low.target_change, Some(0.05));
    assert_eq!(first_low.target_price, Some(105.0));
    assert_eq!(first_low.days_to_target, Some(3));
}

#[test]
fn rebuild_is_idempotent() {
    let mut store = fixture_store();
    let first = rebuild(&mut store, &PipelineParams::default(), &opts(false)).unwrap();
    let rows_first = store.all_inflections().unwrap();

    let second = rebuild(&mut store, &PipelineParams::default(), &opts(false)).unwrap();
    let rows_second = store.all_inflections().unwrap();

    assert_eq!(rows_first, rows_second);
    assert_eq!(second.rows_cleared, first.rows_written);
    assert_eq!(second.rows_written, first.rows_written);
    assert_eq!(second.params_hash, first.params_hash);
    for (symbol, entry) in &first.symbols {
        assert_eq!(entry.bars_hash, second.symbols[symbol].bars_hash);
    }
}

#[test]
fn parallel_and_sequential_agree() {
    let mut sequential = fixture_store();
    let mut parallel = fixture_store();
    let a = rebuild(&mut sequential, &PipelineParams::default(), &opts(false)).unwrap();
    let b = rebuild(&mut parallel, &PipelineParams::default(), &opts(true)).unwrap();

    assert_eq!(a, b);
    assert_eq!(
        sequential.all_inflections().unwrap(),
        parallel.all_inflections().unwrap()
    );
}

#[test]
fn rebuild_leaves_untracked_symbols_alone() {
    let mut store = fixture_store();
    let stale = Inflection {
        symbol: "OLD".into(),
        date: day(3),
        kind: InflectionKind::Low,
        price: 10.0,
        close: 10.0,
        target_change: Some(0.05),
        target_price: Some(10.5),
        days_to_target: None,
        last_updated: stamp(),
    };
    store.replace_symbol("OLD", &[stale.clone()]).unwrap();

    rebuild(&mut store, &PipelineParams::default(), &opts(false)).unwrap();
    assert_eq!(store.inflections_for("OLD").unwrap(), vec![stale]);
}

#[test]
fn lookback_window_limits_loaded_bars() {
    let mut store = fixture_store();
    let narrow = RebuildOptions {
        bar_lookback_days: 20,
        ..opts(false)
    };
    let report = rebuild(&mut store, &PipelineParams::default(), &narrow).unwrap();

    assert_eq!(report.window_start, day(37));
    assert_eq!(report.symbols["AAA"].counts.bars, 21);
    // BBB ends at day 39, leaving three bars: too few for a candidate.
    assert_eq!(
        report.symbols["BBB"].outcome,
        SymbolOutcome::Skipped {
            reason: SkipReason::NoInflections
        }
    );
}

#[test]
fn as_of_caps_the_bar_window() {
    let mut store = fixture_store();
    let historical = RebuildOptions {
        as_of: day(20),
        ..opts(false)
    };
    let report = rebuild(&mut store, &PipelineParams::default(), &historical).unwrap();

    assert_eq!(report.symbols["AAA"].counts.bars, 21);
    let rows = store.inflections_for("AAA").unwrap();
    let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![day(5), day(10), day(15)]);

    // Identical to a store that never held the later bars.
    let mut truncated = seeded_store(&["AAA"], &zigzag("AAA", 21));
    let expected = rebuild(&mut truncated, &PipelineParams::default(), &historical).unwrap();
    assert_eq!(truncated.inflections_for("AAA").unwrap(), rows);
    assert_eq!(
        expected.symbols["AAA"].bars_hash,
        report.symbols["AAA"].bars_hash
    );
}

#[test]
fn oversized_windows_reach_back_to_all_data() {
    let mut store = fixture_store();
    let params = PipelineParams {
        history_window_days: 1_000_000_000,
        ..PipelineParams::default()
    };
    let wide = RebuildOptions {
        bar_lookback_days: 1_000_000_000,
        ..opts(true)
    };
    let report = rebuild(&mut store, &params, &wide).unwrap();

    assert_eq!(report.window_start, NaiveDate::MIN);
    assert_eq!(report.symbols["AAA"].counts.bars, 58);
    assert_eq!(report.rows_written, 18);
}

#[test]
fn invalid_params_abort_before_touching_the_store() {
    let mut store = fixture_store();
    rebuild(&mut store, &PipelineParams::default(), &opts(false)).unwrap();

    let bad = PipelineParams {
        min_change_percent: -1.0,
        ..PipelineParams::default()
    };
    let err = rebuild(&mut store, &bad, &opts(false)).unwrap_err();
    assert!(matches!(err, RebuildError::Params(_)));
    assert_eq!(store.all_inflections().unwrap().len(), 18);

    let err = rebuild(
        &mut store,
        &PipelineParams::default(),
        &RebuildOptions {
            bar_lookback_days: 0,
            ..opts(false)
        },
    )
    .unwrap_err();
    assert!(matches!(err, RebuildError::InvalidLookback(0)));
}

// ── Failure isolation ────────────────────────────────────────────────

/// Wraps a real store and injects failures for chosen symbols.
struct FlakyStore {
    inner: SqliteStore,
    fail_watch_list: bool,
    fail_load: Option<&'static str>,
    /// Writes for this symbol get a duplicate row appended, so the real
    /// transaction fails after some rows were already inserted.
    poison_write: Option<&'static str>,
}

impl FlakyStore {
    fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            fail_watch_list: false,
            fail_load: None,
            poison_write: None,
        }
    }
}

impl BarSource for FlakyStore {
    fn bars_since(&self, symbol: &str, start: NaiveDate) -> Result<Vec<Bar>, StoreError> {
        if self.fail_load == Some(symbol) {
            return Err(StoreError::Backend("injected load failure".into()));
        }
        self.inner.bars_since(symbol, start)
    }
}

impl WatchList for FlakyStore {
    fn tracked_symbols(&self) -> Result<Vec<String>, StoreError> {
        if self.fail_watch_list {
            return Err(StoreError::Backend("watch list unavailable".into()));
        }
        self.inner.tracked_symbols()
    }
}

impl InflectionStore for FlakyStore {
    fn clear(&mut self, symbols: &[String]) -> Result<usize, StoreError> {
        self.inner.clear(symbols)
    }

    fn replace_symbol(
        &mut self,
        symbol: &str,
        inflections: &[Inflection],
    ) -> Result<usize, StoreError> {
        if self.poison_write == Some(symbol) && !inflections.is_empty() {
            let mut rows = inflections.to_vec();
            rows.push(inflections[0].clone());
            return self.inner.replace_symbol(symbol, &rows);
        }
        self.inner.replace_symbol(symbol, inflections)
    }

    fn pending(&self) -> Result<Vec<Inflection>, StoreError> {
        self.inner.pending()
    }

    fn record_resolution(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        target_price: f64,
        days_to_target: Option<u32>,
        updated_at: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        self.inner
            .record_resolution(symbol, date, target_price, days_to_target, updated_at)
    }

    fn inflections_for(&self, symbol: &str) -> Result<Vec<Inflection>, StoreError> {
        self.inner.inflections_for(symbol)
    }
}

#[test]
fn write_failure_rolls_back_symbol_and_batch_continues() {
    let mut store = FlakyStore::new(fixture_store());
    rebuild(&mut store, &PipelineParams::default(), &opts(false)).unwrap();

    store.poison_write = Some("AAA");
    let report = rebuild(&mut store, &PipelineParams::default(), &opts(true)).unwrap();

    match &report.symbols["AAA"].outcome {
        SymbolOutcome::Failed { stage, error } => {
            assert_eq!(*stage, FailureStage::WriteInflections);
            assert!(error.contains("sqlite"), "unexpected error: {error}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    // No partial rows survive for the failed symbol.
    assert!(store.inflections_for("AAA").unwrap().is_empty());
    assert_eq!(store.inflections_for("BBB").unwrap().len(), 7);
    assert_eq!(report.rows_written, 7);
    assert_eq!(report.failed_count(), 1);
}

#[test]
fn load_failure_is_per_symbol() {
    let mut store = FlakyStore::new(fixture_store());
    store.fail_load = Some("BBB");
    let report = rebuild(&mut store, &PipelineParams::default(), &opts(false)).unwrap();

    assert_eq!(
        report.symbols["BBB"].outcome,
        SymbolOutcome::Failed {
            stage: FailureStage::LoadBars,
            error: "injected load failure".into(),
        }
    );
    assert_eq!(report.symbols["AAA"].outcome, SymbolOutcome::Written { rows: 11 });
}

#[test]
fn unreadable_watch_list_is_fatal() {
    let mut store = FlakyStore::new(fixture_store());
    store.fail_watch_list = true;
    let err = rebuild(&mut store, &PipelineParams::default(), &opts(false)).unwrap_err();
    assert!(matches!(err, RebuildError::WatchList(_)));
}

#[test]
fn empty_watch_list_is_zero_progress() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let report = rebuild(&mut store, &PipelineParams::default(), &opts(false)).unwrap();
    assert!(report.symbols.is_empty());
    assert!(report.is_zero_progress());
}
