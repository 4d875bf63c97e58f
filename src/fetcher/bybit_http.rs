//! Bybit HTTP client helper module
//!
//! Provides the HTTP client used for all Bybit API interactions with:
//! - Generic request/response handling
//! - Optional HMAC-SHA256 request signing
//! - One attempt per request; failures surface immediately

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::time::Duration;
use tracing::debug;

use super::bybit_config::{
    BybitOptions, ExchangeCredentials, HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS,
};
use super::{FetcherError, FetcherResult};

type HmacSha256 = Hmac<Sha256>;

/// HTTP client for Bybit REST endpoints
pub struct BybitHttpClient {
    client: Client,
    base_url: String,
    credentials: ExchangeCredentials,
    recv_window_ms: u64,
}

impl BybitHttpClient {
    /// Create a client from options
    ///
    /// # Errors
    /// Returns `FetcherError::NetworkError` if the underlying HTTP client cannot be built
    pub fn new(options: &BybitOptions) -> FetcherResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetcherError::NetworkError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: options.base_url.clone(),
            credentials: options.credentials.clone(),
            recv_window_ms: options.recv_window_ms,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests carry authentication headers
    pub fn is_authenticated(&self) -> bool {
        self.credentials.pair().is_some()
    }

    /// Execute GET request with generic deserialization
    ///
    /// # Arguments
    /// * `endpoint` - API endpoint path (e.g., "/v5/market/kline")
    /// * `params` - Query parameters as key-value pairs
    ///
    /// # Errors
    /// Returns FetcherError on network, HTTP status, or decode failures
    pub async fn get<T>(&self, endpoint: &str, params: &[(&str, String)]) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.build_url(endpoint, params)?;
        let mut request = self.client.get(url.clone());

        if let Some((api_key, api_secret)) = self.credentials.pair() {
            let timestamp = Utc::now().timestamp_millis().to_string();
            let recv_window = self.recv_window_ms.to_string();
            let payload = format!(
                "{timestamp}{api_key}{recv_window}{}",
                url.query().unwrap_or("")
            );
            let signature = sign(api_secret, &payload)?;
            request = request
                .header("X-BAPI-API-KEY", api_key)
                .header("X-BAPI-TIMESTAMP", timestamp)
                .header("X-BAPI-RECV-WINDOW", recv_window)
                .header("X-BAPI-SIGN", signature);
        }

        debug!("GET {} ({} params)", url.path(), params.len());

        let response = request
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(FetcherError::HttpError(format!("{status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetcherError::ParseError(format!("Failed to deserialize response: {e}")))
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, String)]) -> FetcherResult<Url> {
        let raw = format!("{}{}", self.base_url, endpoint);
        let mut url = Url::parse(&raw)
            .map_err(|e| FetcherError::NetworkError(format!("Invalid URL '{raw}': {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

/// Lowercase hex HMAC-SHA256 of `payload` keyed by `secret`
pub fn sign(secret: &str, payload: &str) -> FetcherResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| FetcherError::ParseError(format!("Invalid signing key: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
