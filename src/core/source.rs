use crate::core::error::SourceError;
use crate::core::instrument::{Instrument, RawNav};
use async_trait::async_trait;

/// Upstream fund data source. Implementations fetch and parse only;
/// caching happens a layer above.
#[async_trait]
pub trait FundSource: Send + Sync {
    /// Fetches the full scheme directory, filtered to growth direct
    /// plans with cleaned display names.
    async fn fetch_directory(&self) -> Result<Vec<Instrument>, SourceError>;

    /// Fetches the raw NAV history for one scheme. The result may be in
    /// any order and have calendar gaps.
    async fn fetch_raw_series(&self, scheme_code: u32) -> Result<Vec<RawNav>, SourceError>;
}
