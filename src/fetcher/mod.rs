//! Exchange access
//!
//! [`OhlcvSource`] is the seam between this crate and the exchange: it knows
//! how to load market metadata and how to fetch raw OHLCV records.
//! [`MarketFetcher`] drives a source for one [`RequestDescriptor`] and converts
//! its records into [`Candle`]s.

use crate::request::RequestDescriptor;
use crate::Candle;
use async_trait::async_trait;
use chrono::DateTime;
use tracing::{debug, info};

pub mod bybit;
pub mod bybit_config;
pub mod bybit_http;
pub mod bybit_parser;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Non-success HTTP status
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Transport failure (DNS, connect, timeout)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    ParseError(String),

    /// Exchange answered with an error code
    #[error("API error {code}: {message}")]
    ApiError {
        /// Exchange return code
        code: i64,
        /// Exchange message
        message: String,
    },

    /// Timeframe the exchange has no interval for
    #[error("unsupported timeframe: {0}")]
    UnsupportedTimeframe(String),

    /// Symbol missing from the preloaded market list
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// One OHLCV record exactly as the exchange layer reports it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcvRecord {
    /// Open time (Unix timestamp in milliseconds)
    pub timestamp: i64,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume (base asset)
    pub volume: f64,
}

/// Exchange capability: fetch OHLCV records given symbol/timeframe/since/limit
#[async_trait]
pub trait OhlcvSource: Send + Sync {
    /// Load market metadata ahead of fetching
    ///
    /// # Returns
    /// Number of markets known after loading
    async fn load_markets(&self) -> FetcherResult<usize>;

    /// Fetch at most `limit` records starting at `since`
    ///
    /// # Arguments
    /// * `symbol` - Trading symbol (e.g., "BTC/USDT")
    /// * `timeframe` - Candle timeframe code (e.g., "1m")
    /// * `since` - Start time (Unix timestamp in milliseconds)
    /// * `limit` - Maximum number of records
    ///
    /// # Returns
    /// Records in chronological order
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        since: i64,
        limit: u32,
    ) -> FetcherResult<Vec<OhlcvRecord>>;
}

/// Fetches candles for a request through an [`OhlcvSource`]
pub struct MarketFetcher<S> {
    source: S,
    preload_markets: bool,
}

impl<S: OhlcvSource> MarketFetcher<S> {
    /// Create a fetcher that skips market preloading
    pub fn new(source: S) -> Self {
        Self {
            source,
            preload_markets: false,
        }
    }

    /// Load market metadata before the first fetch
    pub fn with_preload_markets(mut self, preload_markets: bool) -> Self {
        self.preload_markets = preload_markets;
        self
    }

    /// Borrow the underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the candles described by `request`.
    ///
    /// Exactly one OHLCV call is made; the returned order is the source's.
    ///
    /// # Errors
    ///
    /// Propagates any [`FetcherError`] from the source unchanged.
    pub async fn fetch(&self, request: &RequestDescriptor) -> FetcherResult<Vec<Candle>> {
        if self.preload_markets {
            let markets = self.source.load_markets().await?;
            debug!("Preloaded {} markets", markets);
        }

        let since = request.since_millis();
        info!(
            "Fetching OHLCV: symbol={} timeframe={} since={} limit={}",
            request.symbol, request.timeframe, since, request.limit
        );

        let records = self
            .source
            .fetch_ohlcv(&request.symbol, &request.timeframe, since, request.limit)
            .await?;

        debug!("Received {} records", records.len());
        records_to_candles(records)
    }
}

/// Convert raw records to candles, preserving order
///
/// # Errors
/// Returns `FetcherError::ParseError` for a timestamp outside the representable range
pub fn records_to_candles(records: Vec<OhlcvRecord>) -> FetcherResult<Vec<Candle>> {
    records
        .into_iter()
        .map(|record| {
            let time = DateTime::from_timestamp_millis(record.timestamp).ok_or_else(|| {
                FetcherError::ParseError(format!("timestamp {} out of range", record.timestamp))
            })?;
            Ok(Candle {
                time,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            })
        })
        .collect()
}
