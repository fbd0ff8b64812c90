//! Process-wide fund cache
//!
//! Holds the current directory snapshot (instruments + search index,
//! committed together as one `Arc` swap) and a lazily filled map of
//! normalized NAV series. Concurrent lookups for the same uncached
//! scheme coalesce onto a single upstream fetch through a map of shared
//! in-flight handles; the registration is removed when the fetch
//! settles, whatever the outcome.

use crate::core::error::{LookupError, SourceError};
use crate::core::instrument::{CorrectionRule, Instrument, PriceSeries};
use crate::core::series;
use crate::core::source::FundSource;
use crate::search::SearchIndex;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type SharedFetch = Shared<BoxFuture<'static, Option<Arc<PriceSeries>>>>;
type SeriesMap = Arc<RwLock<HashMap<u32, Arc<PriceSeries>>>>;
type InFlightMap = Arc<Mutex<HashMap<u32, SharedFetch>>>;

/// Directory and index built from the same upstream response. Readers
/// always see the pair together.
pub struct DirectorySnapshot {
    pub instruments: Vec<Instrument>,
    pub index: SearchIndex,
}

pub struct FundCache {
    source: Arc<dyn FundSource>,
    corrections: Arc<Vec<CorrectionRule>>,
    directory: RwLock<Option<Arc<DirectorySnapshot>>>,
    series: SeriesMap,
    in_flight: InFlightMap,
}

impl FundCache {
    pub fn new(source: Arc<dyn FundSource>, corrections: Vec<CorrectionRule>) -> Self {
        Self {
            source,
            corrections: Arc::new(corrections),
            directory: RwLock::new(None),
            series: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetches the directory and swaps in a fresh snapshot with its
    /// index. On failure the previous snapshot stays in place.
    pub async fn refresh_directory(&self) -> Result<usize, SourceError> {
        let instruments = self.source.fetch_directory().await?;
        let index = SearchIndex::build(&instruments);
        let count = instruments.len();

        let snapshot = Arc::new(DirectorySnapshot { instruments, index });
        *self.directory.write().unwrap() = Some(snapshot);

        info!(funds = count, "directory snapshot committed");
        Ok(count)
    }

    /// Drops every cached series; the next lookup per scheme re-fetches
    /// lazily. In-flight fetches are not cancelled and re-insert their
    /// own (fresh) result when they settle.
    pub fn invalidate_series(&self) {
        let mut cached = self.series.write().unwrap();
        let dropped = cached.len();
        cached.clear();
        info!(dropped, "cleared cached NAV series");
    }

    fn snapshot(&self) -> Result<Arc<DirectorySnapshot>, LookupError> {
        self.directory
            .read()
            .unwrap()
            .clone()
            .ok_or(LookupError::IndexUnready)
    }

    /// Fuzzy directory search, best match first. Zero-length queries
    /// short-circuit to an empty result even before the first build.
    pub fn search(&self, query: &str) -> Result<Vec<Instrument>, LookupError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.snapshot()?.index.query(query))
    }

    pub fn descriptor(&self, scheme_code: u32) -> Result<Instrument, LookupError> {
        self.snapshot()?
            .instruments
            .iter()
            .find(|instrument| instrument.scheme_code == scheme_code)
            .cloned()
            .ok_or(LookupError::NotFound(scheme_code))
    }

    /// Returns the cached series for a scheme, fetching and normalizing
    /// it on first access. A failed fetch yields an empty series and
    /// leaves the cache entry unset, so the next call retries.
    pub async fn series(&self, scheme_code: u32) -> Result<Arc<PriceSeries>, LookupError> {
        self.descriptor(scheme_code)?;

        if let Some(cached) = self.series.read().unwrap().get(&scheme_code) {
            debug!(scheme_code, "series cache hit");
            return Ok(Arc::clone(cached));
        }
        debug!(scheme_code, "series cache miss");

        let fetch = {
            let mut in_flight = self.in_flight.lock().await;
            // A fetch may have settled between the cache miss and here
            if let Some(cached) = self.series.read().unwrap().get(&scheme_code) {
                return Ok(Arc::clone(cached));
            }
            match in_flight.get(&scheme_code) {
                Some(pending) => {
                    debug!(scheme_code, "joining in-flight fetch");
                    pending.clone()
                }
                None => {
                    let fetch = self.spawn_fetch(scheme_code);
                    in_flight.insert(scheme_code, fetch.clone());
                    fetch
                }
            }
        };

        Ok(fetch.await.unwrap_or_default())
    }

    /// Builds the shared fetch-and-store handle concurrent callers
    /// attach to. The future owns clones of the maps so it stays
    /// `'static`; it clears its own in-flight registration as its final
    /// step, success or failure.
    fn spawn_fetch(&self, scheme_code: u32) -> SharedFetch {
        let source = Arc::clone(&self.source);
        let corrections = Arc::clone(&self.corrections);
        let series_map = Arc::clone(&self.series);
        let in_flight = Arc::clone(&self.in_flight);

        async move {
            let result = match source.fetch_raw_series(scheme_code).await {
                Ok(raw) => {
                    let normalized =
                        Arc::new(series::normalize(scheme_code, &raw, &corrections));
                    series_map
                        .write()
                        .unwrap()
                        .insert(scheme_code, Arc::clone(&normalized));
                    info!(scheme_code, points = normalized.len(), "cached NAV series");
                    Some(normalized)
                }
                Err(err) => {
                    warn!(scheme_code, error = %err, "NAV fetch failed; next lookup retries");
                    None
                }
            };

            in_flight.lock().await.remove(&scheme_code);
            result
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SourceError;
    use crate::core::instrument::RawNav;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeSource {
        directory_calls: AtomicUsize,
        series_calls: AtomicUsize,
        fail_directory: AtomicBool,
        fail_series: AtomicBool,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                directory_calls: AtomicUsize::new(0),
                series_calls: AtomicUsize::new(0),
                fail_directory: AtomicBool::new(false),
                fail_series: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl FundSource for FakeSource {
        async fn fetch_directory(&self) -> Result<Vec<Instrument>, SourceError> {
            self.directory_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_directory.load(Ordering::SeqCst) {
                return Err(SourceError::Unavailable("directory down".to_string()));
            }
            Ok(vec![
                Instrument {
                    scheme_code: 42,
                    name: "Test Flexi Cap Fund".to_string(),
                    isin_growth: Some("INF000000042".to_string()),
                },
                Instrument {
                    scheme_code: 43,
                    name: "Test Liquid Fund".to_string(),
                    isin_growth: Some("INF000000043".to_string()),
                },
            ])
        }

        async fn fetch_raw_series(&self, _scheme_code: u32) -> Result<Vec<RawNav>, SourceError> {
            self.series_calls.fetch_add(1, Ordering::SeqCst);
            // Let concurrent callers pile up before settling
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            if self.fail_series.load(Ordering::SeqCst) {
                return Err(SourceError::Unavailable("series down".to_string()));
            }
            Ok(vec![
                RawNav {
                    date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                    nav: 100.0,
                },
                RawNav {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    nav: 90.0,
                },
            ])
        }
    }

    async fn ready_cache() -> (Arc<FundCache>, Arc<FakeSource>) {
        let source = Arc::new(FakeSource::new());
        let cache = Arc::new(FundCache::new(
            Arc::clone(&source) as Arc<dyn FundSource>,
            vec![],
        ));
        cache.refresh_directory().await.unwrap();
        (cache, source)
    }

    #[tokio::test]
    async fn test_lookups_before_first_build_fail_unready() {
        let source = Arc::new(FakeSource::new());
        let cache = FundCache::new(source as Arc<dyn FundSource>, vec![]);

        assert_eq!(cache.search("test"), Err(LookupError::IndexUnready));
        assert_eq!(cache.descriptor(42), Err(LookupError::IndexUnready));
        assert_eq!(
            cache.series(42).await.unwrap_err(),
            LookupError::IndexUnready
        );
        // Zero-length query never touches the index
        assert_eq!(cache.search(""), Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_descriptor_lookup() {
        let (cache, _) = ready_cache().await;

        assert_eq!(cache.descriptor(42).unwrap().name, "Test Flexi Cap Fund");
        assert_eq!(cache.descriptor(7), Err(LookupError::NotFound(7)));
    }

    #[tokio::test]
    async fn test_series_unknown_scheme_not_found() {
        let (cache, source) = ready_cache().await;

        assert_eq!(cache.series(7).await.unwrap_err(), LookupError::NotFound(7));
        assert_eq!(source.series_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_series_cached_after_first_fetch() {
        let (cache, source) = ready_cache().await;

        let first = cache.series(42).await.unwrap();
        assert_eq!(first.len(), 3);

        let second = cache.series(42).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.series_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_coalesce_to_one_fetch() {
        let (cache, source) = ready_cache().await;

        let lookups = (0..8).map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.series(42).await })
        });
        for handle in lookups {
            let series = handle.await.unwrap().unwrap();
            assert_eq!(series.len(), 3);
        }

        assert_eq!(source.series_calls.load(Ordering::SeqCst), 1);
        assert!(cache.in_flight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_schemes_fetch_independently() {
        let (cache, source) = ready_cache().await;

        let (a, b) = tokio::join!(cache.series(42), cache.series(43));
        a.unwrap();
        b.unwrap();

        assert_eq!(source.series_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_returns_empty_and_retries_next_call() {
        let (cache, source) = ready_cache().await;
        source.fail_series.store(true, Ordering::SeqCst);

        let series = cache.series(42).await.unwrap();
        assert!(series.is_empty());
        assert_eq!(source.series_calls.load(Ordering::SeqCst), 1);
        assert!(cache.in_flight.lock().await.is_empty());

        // Upstream recovers; the next lookup fetches from scratch
        source.fail_series.store(false, Ordering::SeqCst);
        let series = cache.series(42).await.unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(source.series_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidation_forces_refetch() {
        let (cache, source) = ready_cache().await;

        cache.series(42).await.unwrap();
        cache.invalidate_series();
        cache.series(42).await.unwrap();

        assert_eq!(source.series_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_snapshot() {
        let (cache, source) = ready_cache().await;

        source.fail_directory.store(true, Ordering::SeqCst);
        assert!(cache.refresh_directory().await.is_err());

        // Old snapshot still serves lookups
        assert!(cache.descriptor(42).is_ok());
        assert_eq!(cache.search("liquid").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_uses_committed_snapshot() {
        let (cache, _) = ready_cache().await;

        let results = cache.search("flexi").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].scheme_code, 42);
    }

    #[tokio::test]
    async fn test_correction_rules_flow_into_series() {
        let source = Arc::new(FakeSource::new());
        let rules = vec![CorrectionRule {
            scheme_code: 42,
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            multiplier: 0.1,
        }];
        let cache = Arc::new(FundCache::new(
            Arc::clone(&source) as Arc<dyn FundSource>,
            rules,
        ));
        cache.refresh_directory().await.unwrap();

        let series = cache.series(42).await.unwrap();

        assert_eq!(series[0].nav, Some(90.0));
        assert_eq!(series[1].nav, Some(90.0));
        assert_eq!(series[2].nav, Some(10.0));
    }
}
