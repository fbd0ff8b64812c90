//! Core types and abstractions

pub mod config;
pub mod error;
pub mod instrument;
pub mod log;
pub mod series;
pub mod source;

// Re-export main types for cleaner imports
pub use error::{LookupError, SourceError};
pub use instrument::{CorrectionRule, Instrument, PricePoint, PriceSeries, RawNav};
pub use source::FundSource;
