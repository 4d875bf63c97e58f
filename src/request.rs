//! Request resolution and validation
//!
//! Turns raw command-line values into a [`RequestDescriptor`]. Resolution is
//! pure: the current time is passed in and nothing touches the network.

use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;

use crate::MarketType;

/// Default timeframe when none is given
pub const DEFAULT_TIMEFRAME: &str = "1m";

/// Default number of candles
pub const DEFAULT_LIMIT: i64 = 100;

/// Default market type
pub const DEFAULT_MARKET: &str = "linear";

/// How far back `since` reaches when it is not given
pub const DEFAULT_LOOKBACK_HOURS: i64 = 1;

/// Errors raised while resolving a request
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Symbol missing or blank
    #[error("-symbol is required")]
    EmptySymbol,

    /// Limit of zero or below
    #[error("-limit must be greater than 0, got {0}")]
    NonPositiveLimit(i64),

    /// Limit that does not fit a single request
    #[error("-limit {0} exceeds maximum of {max}", max = u32::MAX)]
    LimitTooLarge(i64),

    /// Start time that is not RFC 3339
    #[error("invalid -since format '{input}' (expected RFC3339, e.g. 2024-01-01T00:00:00Z): {source}")]
    InvalidSince {
        /// The rejected input
        input: String,
        /// Underlying parse failure
        source: chrono::ParseError,
    },

    /// Market type outside the accepted set
    #[error("{0}")]
    InvalidMarket(String),
}

/// Raw, unvalidated request values as they arrive from the command line
#[derive(Debug, Clone, Copy)]
pub struct RequestArgs<'a> {
    /// Trading pair symbol
    pub symbol: &'a str,
    /// Candle timeframe code
    pub timeframe: &'a str,
    /// RFC 3339 start time; `None` or empty means one hour ago
    pub since: Option<&'a str>,
    /// Maximum number of candles
    pub limit: i64,
    /// Market type; `None` leaves the category to the exchange default
    pub market: Option<&'a str>,
}

/// Validated request for one OHLCV fetch
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Trading pair symbol (e.g., "BTC/USDT")
    pub symbol: String,
    /// Timeframe code (e.g., "1m"); validated by the exchange layer
    pub timeframe: String,
    /// First candle time
    pub since: DateTime<Utc>,
    /// Maximum number of candles
    pub limit: u32,
    /// Selected market type
    pub market_type: Option<MarketType>,
}

impl RequestDescriptor {
    /// Validate raw arguments into a request.
    ///
    /// `now` anchors the default start time, which is one hour before it.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] for an empty symbol, a non-positive limit, a
    /// start time that is not RFC 3339, or an unknown market type.
    pub fn resolve(args: RequestArgs<'_>, now: DateTime<Utc>) -> Result<Self, RequestError> {
        if args.symbol.trim().is_empty() {
            return Err(RequestError::EmptySymbol);
        }

        let limit = parse_limit(args.limit)?;

        let market_type = args
            .market
            .map(|m| MarketType::from_str(m).map_err(RequestError::InvalidMarket))
            .transpose()?;

        let since = match args.since.filter(|s| !s.is_empty()) {
            Some(input) => parse_since(input)?,
            None => now - Duration::hours(DEFAULT_LOOKBACK_HOURS),
        };

        Ok(Self {
            symbol: args.symbol.to_string(),
            timeframe: args.timeframe.to_string(),
            since,
            limit,
            market_type,
        })
    }

    /// Start time as Unix milliseconds
    pub fn since_millis(&self) -> i64 {
        self.since.timestamp_millis()
    }
}

fn parse_limit(limit: i64) -> Result<u32, RequestError> {
    if limit <= 0 {
        return Err(RequestError::NonPositiveLimit(limit));
    }
    u32::try_from(limit).map_err(|_| RequestError::LimitTooLarge(limit))
}

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_since(input: &str) -> Result<DateTime<Utc>, RequestError> {
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| RequestError::InvalidSince {
            input: input.to_string(),
            source,
        })
}
