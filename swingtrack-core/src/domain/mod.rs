//! Domain types for the inflection pipeline

pub mod bar;
pub mod inflection;

pub use bar::Bar;
pub use inflection::{round4, Inflection, InflectionKind, ParseKindError};
