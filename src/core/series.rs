//! NAV series normalization
//!
//! Upstream history arrives in descending date order with gaps for
//! weekends, holidays and provider outages. Normalization produces the
//! dense ascending series the cache stores: one point per calendar day,
//! forward-filled, scale-corrected and rounded to 2 decimal places.

use crate::core::instrument::{CorrectionRule, PricePoint, PriceSeries, RawNav};
use std::collections::BTreeMap;

/// Builds the dense series for one scheme. Deterministic: the same raw
/// input always yields the same output. Duplicate dates keep the last
/// parsed value. Empty input yields an empty series.
pub fn normalize(scheme_code: u32, raw: &[RawNav], rules: &[CorrectionRule]) -> PriceSeries {
    let mut by_date = BTreeMap::new();
    for quote in raw {
        by_date.insert(quote.date, quote.nav);
    }

    let (first, last) = match (by_date.first_key_value(), by_date.last_key_value()) {
        (Some((&first, _)), Some((&last, _))) => (first, last),
        _ => return PriceSeries::new(),
    };

    let mut series = PriceSeries::new();
    let mut carried = None;
    let mut day = first;
    loop {
        if let Some(nav) = by_date.get(&day) {
            carried = Some(*nav);
        }
        series.push(PricePoint { date: day, nav: carried });
        if day >= last {
            break;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    for rule in rules.iter().filter(|r| r.scheme_code == scheme_code) {
        for point in series.iter_mut().filter(|p| p.date >= rule.effective_date) {
            if let Some(nav) = point.nav.as_mut() {
                *nav *= rule.multiplier;
            }
        }
    }

    for point in series.iter_mut() {
        if let Some(nav) = point.nav.as_mut() {
            *nav = (*nav * 100.0).round() / 100.0;
        }
    }

    series
}
