//! End-to-end pipeline scenarios on small hand-built series.

use chrono::{NaiveDate, NaiveDateTime};
use swingtrack_core::domain::{Bar, InflectionKind};
use swingtrack_core::swing::{days_to_target, detect_extrema, estimate_targets, filter_alternating};
use swingtrack_core::{analyze_symbol, round4, PipelineParams};

fn stamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

/// Bars with high == low == close, one trading day per calendar day.
fn bars_following_closes(closes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar {
            symbol: "TEST".into(),
            date: base + chrono::Duration::days(i as i64),
            open: c,
            high: c,
            low: c,
            close: c,
            volume: 10_000,
        })
        .collect()
}

fn high_count(bars: &[Bar], params: &PipelineParams) -> usize {
    analyze_symbol("TEST", bars, params, stamp())
        .inflections
        .iter()
        .filter(|i| i.kind == InflectionKind::High)
        .count()
}

#[test]
fn scenario_a_spike_above_threshold_yields_one_high() {
    let bars = bars_following_closes(&[100.0, 100.0, 100.0, 130.0, 100.0, 100.0, 100.0]);
    assert_eq!(high_count(&bars, &PipelineParams::default()), 1);

    let analysis = analyze_symbol("TEST", &bars, &PipelineParams::default(), stamp());
    let high = analysis
        .inflections
        .iter()
        .find(|i| i.kind == InflectionKind::High)
        .unwrap();
    assert_eq!(high.date, bars[3].date);
    assert_eq!(high.price, 130.0);
}

#[test]
fn scenario_a_spike_below_threshold_yields_no_high() {
    let bars = bars_following_closes(&[100.0, 100.0, 100.0, 130.0, 100.0, 100.0, 100.0]);
    let strict = PipelineParams {
        min_change_percent: 50.0,
        ..PipelineParams::default()
    };
    assert_eq!(high_count(&bars, &strict), 0);
}

#[test]
fn scenario_b_short_series_yields_nothing() {
    let params = PipelineParams::default();
    let bars = bars_following_closes(&[100.0, 120.0, 90.0, 110.0]);
    assert!(bars.len() < params.min_bars());
    assert!(detect_extrema(&bars, params.half_window).is_empty());
    assert!(analyze_symbol("TEST", &bars, &params, stamp()).is_empty());
}

#[test]
fn scenario_c_no_history_uses_fallback() {
    let bars = bars_following_closes(&[100.0, 100.0, 100.0, 130.0, 100.0, 100.0, 100.0]);
    let params = PipelineParams {
        fallback_target_change: 0.07,
        ..PipelineParams::default()
    };
    let analysis = analyze_symbol("TEST", &bars, &params, stamp());
    // First low and first high have no same-kind history.
    assert_eq!(analysis.inflections[0].target_change, Some(0.07));
    assert_eq!(analysis.inflections[1].target_change, Some(0.07));
    // The second low has history: the first low's +30% rebound.
    assert_eq!(analysis.inflections[2].target_change, Some(0.3));
}

#[test]
fn scenario_d_target_price_from_close() {
    assert_eq!(round4(InflectionKind::Low.target_price(100.0, 0.10)), 110.0);
    assert_eq!(round4(InflectionKind::High.target_price(100.0, 0.10)), 90.0);
}

#[test]
fn scenario_d_through_the_estimator() {
    // Low 100 -> high 110 is a +10% swing; the next low at 100 inherits it.
    let bars = bars_following_closes(&[
        105.0, 104.0, 100.0, 104.0, 106.0, 110.0, 106.0, 104.0, 100.0, 104.0, 105.0,
    ]);
    let params = PipelineParams::default();
    let swings = filter_alternating(detect_extrema(&bars, 2), params.min_change_percent);
    let kinds: Vec<_> = swings.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![InflectionKind::Low, InflectionKind::High, InflectionKind::Low]
    );

    let targets = estimate_targets(&swings, &params);
    assert_eq!(targets[2].target_change, 0.1);
    assert_eq!(targets[2].target_price, 110.0);
}

#[test]
fn scenario_e_unreached_target_stays_null() {
    // A low at 100 followed by a rebound that tops out at 104.
    let bars = bars_following_closes(&[110.0, 106.0, 100.0, 102.0, 104.0, 103.0, 104.0]);
    let analysis = analyze_symbol("TEST", &bars, &PipelineParams::default(), stamp());
    let low = &analysis.inflections[0];
    assert_eq!(low.kind, InflectionKind::Low);
    assert_eq!(low.target_price, Some(105.0));
    assert_eq!(low.days_to_target, None);

    // Appending a bar that reaches the target resolves it.
    let mut extended = bars.clone();
    let mut next_day = bars_following_closes(&[105.5; 8]).pop().unwrap();
    next_day.high = 106.0;
    extended.push(next_day);
    assert_eq!(
        days_to_target(&extended, low.date, InflectionKind::Low, 105.0),
        Some(6)
    );
}

#[test]
fn resolved_count_matches_rows() {
    let bars = bars_following_closes(&[100.0, 100.0, 100.0, 130.0, 100.0, 100.0, 100.0]);
    let analysis = analyze_symbol("TEST", &bars, &PipelineParams::default(), stamp());
    let resolved = analysis
        .inflections
        .iter()
        .filter(|i| i.days_to_target.is_some())
        .count();
    assert_eq!(analysis.counts.resolved, resolved);
}
