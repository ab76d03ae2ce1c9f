//! Swingtrack Runner: batch jobs and persistence around the core pipeline.
//!
//! This crate builds on `swingtrack-core` to provide:
//! - Store interfaces for bars, the watch list and inflection rows
//! - A SQLite implementation of those stores
//! - The full-rebuild batch driver with per-symbol outcomes
//! - The pending-target refresh pass
//! - TOML configuration
//! - CSV/JSON/Markdown export

pub mod config;
pub mod export;
pub mod rebuild;
pub mod refresh;
pub mod sqlite;
pub mod store;

pub use config::{ConfigError, SwingConfig};
pub use export::{export_inflections_csv, export_report_json, import_report_json};
pub use rebuild::{
    rebuild, FailureStage, RebuildError, RebuildOptions, RebuildReport, SkipReason,
    SymbolOutcome, SymbolReport,
};
pub use refresh::{resolve_pending, RefreshReport};
pub use sqlite::SqliteStore;
pub use store::{BarSource, InflectionStore, StoreError, WatchList};
