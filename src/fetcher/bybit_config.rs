//! Bybit connection configuration
//!
//! Endpoints, timeframe codes and the options a [`super::bybit::BybitClient`]
//! is built from. Credentials are loaded once, at startup, into an explicit
//! [`ExchangeCredentials`] value rather than read from the environment at
//! request time.

use crate::MarketCategory;

/// Mainnet REST base URL
pub const MAINNET_BASE_URL: &str = "https://api.bybit.com";

/// Testnet REST base URL
pub const TESTNET_BASE_URL: &str = "https://api-testnet.bybit.com";

/// Kline endpoint path
pub const KLINE_ENDPOINT: &str = "/v5/market/kline";

/// Instruments info endpoint path
pub const INSTRUMENTS_ENDPOINT: &str = "/v5/market/instruments-info";

/// Page size for instruments info requests (exchange maximum)
pub const INSTRUMENTS_PAGE_LIMIT: u32 = 1000;

/// Default receive window for signed requests, in milliseconds
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5000;

/// HTTP connect timeout (seconds)
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP request timeout (seconds)
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "BYBIT_API_KEY";

/// Environment variable holding the API secret
pub const API_SECRET_ENV: &str = "BYBIT_API_SECRET";

/// Environment variable overriding the REST base URL
pub const BASE_URL_ENV: &str = "BYBIT_BASE_URL";

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Timeframe code, Bybit interval code, and fixed duration in milliseconds.
///
/// Months have no fixed duration.
const TIMEFRAMES: &[(&str, &str, Option<i64>)] = &[
    ("1m", "1", Some(MINUTE_MS)),
    ("3m", "3", Some(3 * MINUTE_MS)),
    ("5m", "5", Some(5 * MINUTE_MS)),
    ("15m", "15", Some(15 * MINUTE_MS)),
    ("30m", "30", Some(30 * MINUTE_MS)),
    ("1h", "60", Some(HOUR_MS)),
    ("2h", "120", Some(2 * HOUR_MS)),
    ("4h", "240", Some(4 * HOUR_MS)),
    ("6h", "360", Some(6 * HOUR_MS)),
    ("12h", "720", Some(12 * HOUR_MS)),
    ("1d", "D", Some(DAY_MS)),
    ("1w", "W", Some(7 * DAY_MS)),
    ("1M", "M", None),
];

/// Bybit interval code for a timeframe, if the exchange supports it
pub fn interval_code(timeframe: &str) -> Option<&'static str> {
    TIMEFRAMES
        .iter()
        .find(|(code, _, _)| *code == timeframe)
        .map(|(_, interval, _)| *interval)
}

/// Fixed duration of a timeframe in milliseconds
pub fn timeframe_millis(timeframe: &str) -> Option<i64> {
    TIMEFRAMES
        .iter()
        .find(|(code, _, _)| *code == timeframe)
        .and_then(|(_, _, millis)| *millis)
}

/// API credentials. Either half may be absent; public endpoints work without them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ExchangeCredentials {
    api_key: Option<String>,
    api_secret: Option<String>,
}

impl ExchangeCredentials {
    /// Build credentials from explicit values; empty strings count as absent
    pub fn new(api_key: Option<String>, api_secret: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|v| !v.is_empty()),
            api_secret: api_secret.filter(|v| !v.is_empty()),
        }
    }

    /// Read `BYBIT_API_KEY` and `BYBIT_API_SECRET` from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(lookup(API_KEY_ENV), lookup(API_SECRET_ENV))
    }

    /// API key, if set
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// API secret, if set
    pub fn api_secret(&self) -> Option<&str> {
        self.api_secret.as_deref()
    }

    /// Key and secret together, when both are present
    pub fn pair(&self) -> Option<(&str, &str)> {
        Some((self.api_key()?, self.api_secret()?))
    }
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Options a Bybit client is constructed from
#[derive(Debug, Clone)]
pub struct BybitOptions {
    /// REST base URL
    pub base_url: String,
    /// Credentials used to sign requests
    pub credentials: ExchangeCredentials,
    /// Market category requests are made in
    pub category: MarketCategory,
    /// Receive window for signed requests, in milliseconds
    pub recv_window_ms: u64,
}

impl BybitOptions {
    /// Mainnet options without credentials
    pub fn new(category: MarketCategory) -> Self {
        Self {
            base_url: MAINNET_BASE_URL.to_string(),
            credentials: ExchangeCredentials::default(),
            category,
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
        }
    }

    /// Use a different REST base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sign requests with these credentials
    pub fn with_credentials(mut self, credentials: ExchangeCredentials) -> Self {
        self.credentials = credentials;
        self
    }
}
