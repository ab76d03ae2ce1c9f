//! SQLite-backed store: bars, the watch list and persisted inflections.
//!
//! Tables:
//! - `stock_data(ticker, date, open, high, low, close, volume)`
//! - `interested_tickers(ticker)`
//! - `ticker_inflections(ticker, date, type, price, close, target_change,
//!   target_price, days_to_target, last_updated)`
//!
//! Dates are stored as `YYYY-MM-DD` text so range queries compare
//! lexicographically in date order.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use swingtrack_core::domain::{Bar, Inflection, InflectionKind};

use crate::store::{BarSource, InflectionStore, StoreError, WatchList};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stock_data (
    ticker  TEXT    NOT NULL,
    date    TEXT    NOT NULL,
    open    REAL    NOT NULL,
    high    REAL    NOT NULL,
    low     REAL    NOT NULL,
    close   REAL    NOT NULL,
    volume  INTEGER NOT NULL,
    PRIMARY KEY (ticker, date)
);

CREATE TABLE IF NOT EXISTS interested_tickers (
    ticker TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS ticker_inflections (
    ticker          TEXT    NOT NULL,
    date            TEXT    NOT NULL,
    type            TEXT    NOT NULL CHECK (type IN ('high', 'low')),
    price           REAL    NOT NULL,
    close           REAL    NOT NULL,
    target_change   REAL,
    target_price    REAL,
    days_to_target  INTEGER,
    last_updated    TEXT    NOT NULL,
    PRIMARY KEY (ticker, date)
);

CREATE INDEX IF NOT EXISTS idx_ticker_inflections_pending
    ON ticker_inflections (days_to_target);
"#;

const INFLECTION_COLUMNS: &str =
    "ticker, date, type, price, close, target_change, target_price, days_to_target, last_updated";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a database file and make sure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Backend(format!("create {}: {e}", parent.display())))?;
            }
        }
        let conn = Connection::open(path)?;
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;");
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Insert or overwrite bars. Returns the number of rows written.
    pub fn insert_bars(&mut self, bars: &[Bar]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO stock_data (ticker, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for bar in bars {
                let volume =
                    i64::try_from(bar.volume).map_err(|_| StoreError::InvalidVolume {
                        symbol: bar.symbol.clone(),
                        value: bar.volume.to_string(),
                    })?;
                stmt.execute(params![
                    bar.symbol,
                    bar.date.to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    volume,
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Add `symbol` to the watch list. Returns false if it was already tracked.
    pub fn track_symbol(&self, symbol: &str) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO interested_tickers (ticker) VALUES (?1)",
            params![symbol],
        )?;
        Ok(inserted > 0)
    }

    /// Every stored inflection, ordered by symbol and date.
    pub fn all_inflections(&self) -> Result<Vec<Inflection>, StoreError> {
        self.query_inflections(
            &format!("SELECT {INFLECTION_COLUMNS} FROM ticker_inflections ORDER BY ticker, date"),
            [],
        )
    }

    fn query_inflections<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<Inflection>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let raw = stmt
            .query_map(params, RawInflection::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawInflection::into_inflection).collect()
    }
}

/// A `ticker_inflections` row before its text columns are validated.
struct RawInflection {
    symbol: String,
    date: String,
    kind: String,
    price: f64,
    close: f64,
    target_change: Option<f64>,
    target_price: Option<f64>,
    days_to_target: Option<u32>,
    last_updated: NaiveDateTime,
}

impl RawInflection {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            symbol: row.get(0)?,
            date: row.get(1)?,
            kind: row.get(2)?,
            price: row.get(3)?,
            close: row.get(4)?,
            target_change: row.get(5)?,
            target_price: row.get(6)?,
            days_to_target: row.get(7)?,
            last_updated: row.get(8)?,
        })
    }

    fn into_inflection(self) -> Result<Inflection, StoreError> {
        let date = parse_date(&self.symbol, &self.date)?;
        let kind = self
            .kind
            .parse::<InflectionKind>()
            .map_err(|_| StoreError::InvalidKind {
                symbol: self.symbol.clone(),
                value: self.kind.clone(),
            })?;
        Ok(Inflection {
            symbol: self.symbol,
            date,
            kind,
            price: self.price,
            close: self.close,
            target_change: self.target_change,
            target_price: self.target_price,
            days_to_target: self.days_to_target,
            last_updated: self.last_updated,
        })
    }
}

fn parse_date(symbol: &str, value: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| StoreError::InvalidDate {
        symbol: symbol.to_string(),
        value: value.to_string(),
    })
}

impl SqliteStore {
    fn query_bars<P: rusqlite::Params>(
        &self,
        symbol: &str,
        sql: &str,
        params: P,
    ) -> Result<Vec<Bar>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(date, open, high, low, close, volume)| {
                Ok(Bar {
                    symbol: symbol.to_string(),
                    date: parse_date(symbol, &date)?,
                    open,
                    high,
                    low,
                    close,
                    volume: u64::try_from(volume).map_err(|_| StoreError::InvalidVolume {
                        symbol: symbol.to_string(),
                        value: volume.to_string(),
                    })?,
                })
            })
            .collect()
    }
}

impl BarSource for SqliteStore {
    fn bars_since(&self, symbol: &str, start: NaiveDate) -> Result<Vec<Bar>, StoreError> {
        self.query_bars(
            symbol,
            "SELECT date, open, high, low, close, volume
             FROM stock_data
             WHERE ticker = ?1 AND date >= ?2
             ORDER BY date",
            params![symbol, start.to_string()],
        )
    }

    fn bars_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, StoreError> {
        self.query_bars(
            symbol,
            "SELECT date, open, high, low, close, volume
             FROM stock_data
             WHERE ticker = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date",
            params![symbol, start.to_string(), end.to_string()],
        )
    }
}

impl WatchList for SqliteStore {
    fn tracked_symbols(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT ticker FROM interested_tickers ORDER BY ticker")?;
        let symbols = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(symbols)
    }
}

impl InflectionStore for SqliteStore {
    fn clear(&mut self, symbols: &[String]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM ticker_inflections WHERE ticker = ?1")?;
            for symbol in symbols {
                deleted += stmt.execute(params![symbol])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    fn replace_symbol(
        &mut self,
        symbol: &str,
        inflections: &[Inflection],
    ) -> Result<usize, StoreError> {
        // Dropping the transaction without commit rolls the symbol back.
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM ticker_inflections WHERE ticker = ?1",
            params![symbol],
        )?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO ticker_inflections ({INFLECTION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ))?;
            for inflection in inflections {
                stmt.execute(params![
                    symbol,
                    inflection.date.to_string(),
                    inflection.kind.as_str(),
                    inflection.price,
                    inflection.close,
                    inflection.target_change,
                    inflection.target_price,
                    inflection.days_to_target,
                    inflection.last_updated,
                ])?;
                written += 1;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    fn pending(&self) -> Result<Vec<Inflection>, StoreError> {
        self.query_inflections(
            &format!(
                "SELECT {INFLECTION_COLUMNS} FROM ticker_inflections
                 WHERE days_to_target IS NULL
                 ORDER BY ticker, date"
            ),
            [],
        )
    }

    fn record_resolution(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        target_price: f64,
        days_to_target: Option<u32>,
        updated_at: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        let updated = self.conn.execute(
            "UPDATE ticker_inflections
             SET target_price = ?1, days_to_target = ?2, last_updated = ?3
             WHERE ticker = ?4 AND date = ?5",
            params![
                target_price,
                days_to_target,
                updated_at,
                symbol,
                date.to_string()
            ],
        )?;
        Ok(updated > 0)
    }

    fn inflections_for(&self, symbol: &str) -> Result<Vec<Inflection>, StoreError> {
        self.query_inflections(
            &format!(
                "SELECT {INFLECTION_COLUMNS} FROM ticker_inflections
                 WHERE ticker = ?1
                 ORDER BY date"
            ),
            params![symbol],
        )
    }
}
