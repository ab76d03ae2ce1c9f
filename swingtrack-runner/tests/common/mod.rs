//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use swingtrack_core::domain::Bar;
use swingtrack_runner::SqliteStore;

pub fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

pub fn day(offset: i64) -> NaiveDate {
    base_date() + Duration::days(offset)
}

pub fn stamp() -> NaiveDateTime {
    day(60).and_hms_opt(18, 0, 0).unwrap()
}

/// Bar with high/low half a point around the close, `offset` days after
/// the base date.
pub fn bar(symbol: &str, offset: i64, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        date: day(offset),
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 250_000,
    }
}

/// Triangle wave between 100 and 120 with a 10-bar period: peaks at
/// offsets 5, 15, 25, ... and troughs at 10, 20, 30, ...
pub fn zigzag_close(offset: i64) -> f64 {
    let phase = offset % 10;
    if phase <= 5 {
        100.0 + 4.0 * phase as f64
    } else {
        120.0 - 4.0 * (phase - 5) as f64
    }
}

/// `n` zigzag bars starting at offset 0.
pub fn zigzag(symbol: &str, n: i64) -> Vec<Bar> {
    (0..n).map(|i| bar(symbol, i, zigzag_close(i))).collect()
}

/// In-memory store tracking `symbols`, seeded with `bars`.
pub fn seeded_store(symbols: &[&str], bars: &[Bar]) -> SqliteStore {
    let mut store = SqliteStore::open_in_memory().unwrap();
    for symbol in symbols {
        store.track_symbol(symbol).unwrap();
    }
    store.insert_bars(bars).unwrap();
    store
}
