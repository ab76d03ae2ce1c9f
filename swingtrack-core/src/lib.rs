//! Swingtrack Core: the inflection and target-tracking pipeline.
//!
//! This crate contains the pure, I/O-free part of the system:
//! - Domain types (bars, inflections, inflection kinds)
//! - Extrema detection over a centred rolling window
//! - Alternation filtering with a minimum swing threshold
//! - Target estimation from each symbol's own prior swings
//! - Horizon scanning for days-to-target
//! - Per-symbol pipeline composition and input fingerprints

pub mod domain;
pub mod fingerprint;
pub mod params;
pub mod pipeline;
pub mod swing;

pub use domain::{round4, Bar, Inflection, InflectionKind};
pub use params::{days_before, ParamsError, PipelineParams};
pub use pipeline::{analyze_symbol, SymbolAnalysis};
