//! Fuzzy lookup over the fund directory
//!
//! Matches free-text queries against scheme code, display name and ISIN.
//! Scoring combines substring containment with Jaro-Winkler token
//! similarity so minor typos, word reordering and partial names still
//! resolve. The index is immutable; a directory rebuild constructs a
//! fresh one.

use crate::core::instrument::Instrument;
use strsim::jaro_winkler;

/// Minimum score for a result to qualify. Tuned loosely: one-character
/// typos in a fund-house word stay above it, unrelated names fall below.
const MIN_SCORE: f64 = 0.75;

pub struct SearchIndex {
    entries: Vec<Entry>,
}

struct Entry {
    instrument: Instrument,
    code: String,
    name: String,
    isin: String,
}

impl SearchIndex {
    pub fn build(instruments: &[Instrument]) -> Self {
        let entries = instruments
            .iter()
            .map(|instrument| Entry {
                code: instrument.scheme_code.to_string(),
                name: instrument.name.to_lowercase(),
                isin: instrument
                    .isin_growth
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase(),
                instrument: instrument.clone(),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns matching descriptors, best match first. Queries shorter
    /// than one character yield no results without scanning the index.
    pub fn query(&self, query: &str) -> Vec<Instrument> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let terms: Vec<&str> = query.split_whitespace().collect();

        let mut scored: Vec<(f64, &Instrument)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let score = entry.score(&query, &terms);
                (score >= MIN_SCORE).then_some((score, &entry.instrument))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .map(|(_, instrument)| instrument.clone())
            .collect()
    }
}

impl Entry {
    fn score(&self, query: &str, terms: &[&str]) -> f64 {
        [
            self.code.as_str(),
            self.name.as_str(),
            self.isin.as_str(),
        ]
        .into_iter()
        .filter(|field| !field.is_empty())
        .map(|field| field_score(field, query, terms))
        .fold(0.0, f64::max)
    }
}

fn field_score(field: &str, query: &str, terms: &[&str]) -> f64 {
    if field == query {
        return 1.0;
    }
    if field.contains(query) {
        return 0.95;
    }

    // Word-order tolerant: each query term takes its best match among
    // the field's words, and the term scores are averaged
    let total: f64 = terms
        .iter()
        .map(|term| {
            field
                .split_whitespace()
                .map(|word| {
                    if word.contains(term) {
                        0.9
                    } else {
                        jaro_winkler(word, term)
                    }
                })
                .fold(0.0, f64::max)
        })
        .sum();
    total / terms.len() as f64
}
