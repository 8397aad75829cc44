//! Datafeed module for connecting to the asset k-line backend.

use async_trait::async_trait;

use crate::kline::{AssetInfo, Channel, FetchMode, KlineSeries};

pub mod error;
pub mod rest_client;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{classify_message, DatafeedError, NotReadyReason};
pub use rest_client::KlineRestClient;

/// Abstract datafeed trait for the asset data API.
///
/// Implementations report non-data states of the backend through
/// [`DatafeedError`] kinds rather than raw message text.
#[async_trait]
pub trait BaseDatafeed: Send + Sync {
    /// Initialize datafeed service connection
    async fn init(&self) -> Result<bool, DatafeedError> {
        Ok(false)
    }

    /// Query the materialized k-line window of a channel
    async fn query_kline(&self, _asset_id: u64, _channel: Channel) -> Result<KlineSeries, DatafeedError> {
        Err(DatafeedError::NotConfigured)
    }

    /// Ask the backend to start computing k-line data for a channel
    async fn prime_kline(&self, _asset_id: u64, _channel: Channel) -> Result<KlineSeries, DatafeedError> {
        Err(DatafeedError::NotConfigured)
    }

    /// Query asset name and price statistics
    async fn query_asset_info(&self, _asset_id: u64) -> Result<AssetInfo, DatafeedError> {
        Err(DatafeedError::NotConfigured)
    }

    /// Dispatch on fetch mode
    async fn fetch_kline(
        &self,
        asset_id: u64,
        channel: Channel,
        mode: FetchMode,
    ) -> Result<KlineSeries, DatafeedError> {
        match mode {
            FetchMode::Query => self.query_kline(asset_id, channel).await,
            FetchMode::Prime => self.prime_kline(asset_id, channel).await,
        }
    }
}
