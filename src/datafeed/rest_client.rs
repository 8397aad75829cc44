//! REST client for the asset k-line endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::error::{classify_message, error_from_body, DatafeedError};
use super::BaseDatafeed;
use crate::base::setting::Settings;
use crate::kline::{AssetInfo, Channel, KlineResponse, KlineSeries};

const KLINE_QUERY_PATH: &str = "api/user/asset/getKlineInfo";
const KLINE_PRIME_PATH: &str = "api/user/asset/handleKlineInfo";
const ASSET_INFO_PATH: &str = "api/user/asset/getAssetInfo";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT: u64 = 30;

/// HTTP datafeed talking to the asset backend
pub struct KlineRestClient {
    /// HTTP client
    client: Client,
    /// Base URL, always ending with a slash
    host: Url,
    /// Bearer token sent with every request
    token: Option<String>,
}

impl KlineRestClient {
    /// Create a new REST client
    pub fn new(host: &str, timeout: Duration) -> Result<Self, DatafeedError> {
        let host = parse_host(host)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DatafeedError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            host,
            token: None,
        })
    }

    /// Create a client from the `server.*` settings
    pub fn from_settings(settings: &Settings) -> Result<Self, DatafeedError> {
        let host = settings.get_string("server.host").unwrap_or_default();
        let timeout = settings
            .get_int("server.timeout")
            .filter(|t| *t > 0)
            .unwrap_or(DEFAULT_TIMEOUT as i64) as u64;
        let token = settings.get_string("server.token").unwrap_or_default();

        let client = Self::new(&host, Duration::from_secs(timeout))?;
        if token.is_empty() {
            Ok(client)
        } else {
            Ok(client.with_token(token))
        }
    }

    /// Attach a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Base URL of the backend
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Build the k-line endpoint URL for a channel
    pub fn kline_url(&self, path: &str, asset_id: u64, channel: Channel) -> Result<Url, DatafeedError> {
        let mut url = self
            .host
            .join(&format!("{}/{}", path, asset_id))
            .map_err(|e| DatafeedError::Transport(e.to_string()))?;
        url.query_pairs_mut().append_pair("type", channel.value());
        Ok(url)
    }

    /// Build the asset info endpoint URL
    pub fn asset_info_url(&self, asset_id: u64) -> Result<Url, DatafeedError> {
        let mut url = self
            .host
            .join(ASSET_INFO_PATH)
            .map_err(|e| DatafeedError::Transport(e.to_string()))?;
        url.query_pairs_mut().append_pair("id", &asset_id.to_string());
        Ok(url)
    }

    /// Send a request and return status code and body text
    async fn request(&self, method: Method, url: Url) -> Result<(u16, String), DatafeedError> {
        debug!("Asset API request: {} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DatafeedError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| DatafeedError::Transport(format!("Failed to read response: {}", e)))?;

        Ok((status, text))
    }
}

/// Parse and normalize the base URL so relative joins append to it
fn parse_host(host: &str) -> Result<Url, DatafeedError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(DatafeedError::NotConfigured);
    }
    let normalized = if host.ends_with('/') {
        host.to_string()
    } else {
        format!("{}/", host)
    };
    Url::parse(&normalized).map_err(|e| DatafeedError::Transport(format!("invalid host {}: {}", host, e)))
}

/// Decode a k-line endpoint response.
///
/// A 2xx body holding a bare JSON string is a status message, not data.
pub fn decode_kline(status: u16, body: &str) -> Result<KlineSeries, DatafeedError> {
    if !(200..300).contains(&status) {
        return Err(error_from_body(status, body));
    }

    let value: Value = serde_json::from_str(body).map_err(|e| DatafeedError::Decode(e.to_string()))?;
    if let Value::String(message) = value {
        return Err(classify_message(&message).unwrap_or(DatafeedError::Server { status, message }));
    }

    let response: KlineResponse =
        serde_json::from_value(value).map_err(|e| DatafeedError::Decode(e.to_string()))?;
    response.into_series().map_err(DatafeedError::Decode)
}

/// Decode an asset info response
pub fn decode_asset_info(status: u16, body: &str) -> Result<AssetInfo, DatafeedError> {
    if !(200..300).contains(&status) {
        return Err(error_from_body(status, body));
    }
    serde_json::from_str(body).map_err(|e| DatafeedError::Decode(e.to_string()))
}

#[async_trait]
impl BaseDatafeed for KlineRestClient {
    async fn init(&self) -> Result<bool, DatafeedError> {
        Ok(true)
    }

    async fn query_kline(&self, asset_id: u64, channel: Channel) -> Result<KlineSeries, DatafeedError> {
        let url = self.kline_url(KLINE_QUERY_PATH, asset_id, channel)?;
        let (status, body) = self.request(Method::GET, url).await?;
        decode_kline(status, &body)
    }

    async fn prime_kline(&self, asset_id: u64, channel: Channel) -> Result<KlineSeries, DatafeedError> {
        let url = self.kline_url(KLINE_PRIME_PATH, asset_id, channel)?;
        let (status, body) = self.request(Method::POST, url).await?;
        let result = decode_kline(status, &body);
        if let Err(DatafeedError::Server { message, .. }) = &result {
            warn!("資產{} {}圖表處理請求失敗: {}", asset_id, channel.display_name(), message);
        }
        result
    }

    async fn query_asset_info(&self, asset_id: u64) -> Result<AssetInfo, DatafeedError> {
        let url = self.asset_info_url(asset_id)?;
        let (status, body) = self.request(Method::GET, url).await?;
        decode_asset_info(status, &body)
    }
}
