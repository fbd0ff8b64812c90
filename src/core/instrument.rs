//! Fund instrument and NAV series types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One tradeable fund scheme from the upstream directory, after
/// filtering and name cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub scheme_code: u32,
    pub name: String,
    pub isin_growth: Option<String>,
}

/// NAV on one calendar day. `nav` is `None` only for days that precede
/// the first known value of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub nav: Option<f64>,
}

/// Ascending daily NAV series with one point per calendar day between
/// its first and last date. Replaced wholesale on refresh.
pub type PriceSeries = Vec<PricePoint>;

/// Rescales all NAVs of a scheme on/after `effective_date`, correcting a
/// historical unit split the upstream data never adjusted for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionRule {
    pub scheme_code: u32,
    pub effective_date: NaiveDate,
    pub multiplier: f64,
}

/// A single parsed upstream quote. Arrival order and gaps are arbitrary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawNav {
    pub date: NaiveDate,
    pub nav: f64,
}
