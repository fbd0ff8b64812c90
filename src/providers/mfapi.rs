//! Upstream adapter for the public mutual fund API
//!
//! Two endpoints: the full scheme directory at `{base_url}` and the NAV
//! history for one scheme at `{base_url}/{scheme_code}`. History arrives
//! descending by date with string-typed values and `DD-MM-YYYY` dates.

use crate::core::config::ProviderConfig;
use crate::core::error::SourceError;
use crate::core::instrument::{Instrument, RawNav};
use crate::core::source::FundSource;
use crate::providers::util::with_retry;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

/// Scheme-name fragments that mark commission plans and payout variants.
/// Matched case-insensitively against the raw (uncleaned) name.
const DISALLOWED_KEYWORDS: [&str; 6] = [
    "regular",
    "idcw",
    "income distribution",
    "capital withdrawal",
    "bonus option",
    "dividend option",
];

pub struct MfapiProvider {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl MfapiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("mfnav/0.1")
            .timeout(config.timeout())
            .build()?;
        Ok(MfapiProvider {
            base_url: config.base_url.clone(),
            client,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        debug!("Requesting {}", url);
        let response = with_retry(
            || async { self.client.get(url).send().await },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .map_err(|e| SourceError::Unavailable(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "{url} returned status {status}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Unavailable(format!("failed to read body of {url}: {e}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScheme {
    scheme_code: u32,
    scheme_name: String,
    isin_growth: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(default)]
    data: Vec<RawQuote>,
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    date: String,
    nav: String,
}

#[async_trait]
impl FundSource for MfapiProvider {
    async fn fetch_directory(&self) -> Result<Vec<Instrument>, SourceError> {
        let body = self.get_text(&self.base_url).await?;

        let schemes: Vec<RawScheme> = serde_json::from_str(&body)
            .map_err(|e| SourceError::Malformed(format!("scheme directory: {e}")))?;

        let instruments = schemes
            .into_iter()
            .filter(|scheme| {
                scheme.isin_growth.is_some() && !has_disallowed_keyword(&scheme.scheme_name)
            })
            .map(|scheme| Instrument {
                scheme_code: scheme.scheme_code,
                name: clean_scheme_name(&scheme.scheme_name),
                isin_growth: scheme.isin_growth,
            })
            .collect::<Vec<_>>();

        debug!(
            "Fetched directory with {} growth direct schemes",
            instruments.len()
        );
        Ok(instruments)
    }

    async fn fetch_raw_series(&self, scheme_code: u32) -> Result<Vec<RawNav>, SourceError> {
        let url = format!("{}/{}", self.base_url, scheme_code);
        let body = self.get_text(&url).await?;

        let history: RawHistory = serde_json::from_str(&body)
            .map_err(|e| SourceError::Malformed(format!("NAV history for {scheme_code}: {e}")))?;

        if history.data.is_empty() {
            return Err(SourceError::Malformed(format!(
                "empty NAV history for scheme {scheme_code}"
            )));
        }

        history
            .data
            .iter()
            .map(|quote| {
                let date = NaiveDate::parse_from_str(&quote.date, "%d-%m-%Y").map_err(|e| {
                    SourceError::Malformed(format!(
                        "bad date '{}' for scheme {scheme_code}: {e}",
                        quote.date
                    ))
                })?;
                let nav = quote.nav.parse::<f64>().map_err(|e| {
                    SourceError::Malformed(format!(
                        "bad NAV '{}' for scheme {scheme_code}: {e}",
                        quote.nav
                    ))
                })?;
                Ok(RawNav { date, nav })
            })
            .collect()
    }
}

fn has_disallowed_keyword(raw_name: &str) -> bool {
    let name = raw_name.to_lowercase();
    DISALLOWED_KEYWORDS
        .iter()
        .any(|keyword| name.contains(keyword))
}

/// Shortens raw scheme names for display.
/// Ex: "Parag Parikh Liquid Fund- Direct Plan- Growth" => "Parag Parikh Liquid Fund"
fn clean_scheme_name(raw_name: &str) -> String {
    let without_plan = strip_all_ignore_case(raw_name, "direct plan");
    let without_growth = strip_all_ignore_case(&without_plan, "growth");
    let without_hyphens: String = without_growth.chars().filter(|c| *c != '-').collect();

    let collapsed = without_hyphens
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    collapsed
        .strip_suffix("Direct")
        .map(|rest| rest.trim_end().to_string())
        .unwrap_or(collapsed)
}

/// Removes every occurrence of an ASCII `pattern`, ignoring case.
fn strip_all_ignore_case(input: &str, pattern: &str) -> String {
    let find = |haystack: &str| {
        haystack
            .as_bytes()
            .windows(pattern.len())
            .position(|window| window.eq_ignore_ascii_case(pattern.as_bytes()))
    };

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = find(rest) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + pattern.len()..];
    }
    out.push_str(rest);
    out
}
