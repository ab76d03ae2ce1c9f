//! Store interfaces consumed and exposed by the batch jobs.
//!
//! The rebuild and refresh passes never hold a connection of their own;
//! callers hand them a store implementing these traits.

use chrono::{NaiveDate, NaiveDateTime};
use swingtrack_core::domain::{Bar, Inflection};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid inflection kind '{value}' stored for {symbol}")]
    InvalidKind { symbol: String, value: String },

    #[error("invalid date '{value}' stored for {symbol}")]
    InvalidDate { symbol: String, value: String },

    #[error("volume {value} for {symbol} does not fit the bar store")]
    InvalidVolume { symbol: String, value: String },

    /// Failure raised by a store that is not backed by SQLite.
    #[error("{0}")]
    Backend(String),
}

/// Daily bar series, owned by an external collaborator.
pub trait BarSource {
    /// Bars for `symbol` dated on or after `start`, ordered by date.
    fn bars_since(&self, symbol: &str, start: NaiveDate) -> Result<Vec<Bar>, StoreError>;

    /// Bars for `symbol` dated within `[start, end]`, ordered by date.
    fn bars_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, StoreError> {
        let mut bars = self.bars_since(symbol, start)?;
        bars.retain(|bar| bar.date <= end);
        Ok(bars)
    }
}

/// The set of symbols a rebuild covers.
pub trait WatchList {
    fn tracked_symbols(&self) -> Result<Vec<String>, StoreError>;
}

/// Persisted inflections, one row per (symbol, date).
pub trait InflectionStore {
    /// Delete every row for `symbols`. Returns the number of rows deleted.
    fn clear(&mut self, symbols: &[String]) -> Result<usize, StoreError>;

    /// Replace all rows for `symbol` with `inflections` atomically. On error
    /// nothing for `symbol` has changed.
    fn replace_symbol(&mut self, symbol: &str, inflections: &[Inflection])
        -> Result<usize, StoreError>;

    /// Rows whose days-to-target is still unknown, ordered by symbol and date.
    fn pending(&self) -> Result<Vec<Inflection>, StoreError>;

    /// Store the target price and horizon for one row. Returns whether a row
    /// was updated.
    fn record_resolution(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        target_price: f64,
        days_to_target: Option<u32>,
        updated_at: NaiveDateTime,
    ) -> Result<bool, StoreError>;

    /// All rows for `symbol`, ordered by date.
    fn inflections_for(&self, symbol: &str) -> Result<Vec<Inflection>, StoreError>;
}
