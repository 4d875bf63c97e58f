//! # OHLCV Export Library
//!
//! Fetches a bounded run of historical OHLCV candles for one trading pair from
//! the Bybit v5 REST API and renders them as CSV.
//!
//! ## Pipeline
//!
//! The binary is a single linear pipeline:
//!
//! 1. [`request`] resolves command-line input into a validated [`request::RequestDescriptor`]
//! 2. [`fetcher`] turns the descriptor into a list of [`Candle`]s through an [`fetcher::OhlcvSource`]
//! 3. [`output`] writes the candles as CSV
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::Utc;
//! use ohlcv_export::fetcher::bybit::BybitClient;
//! use ohlcv_export::fetcher::bybit_config::BybitOptions;
//! use ohlcv_export::fetcher::MarketFetcher;
//! use ohlcv_export::output::csv::CsvCandlesWriter;
//! use ohlcv_export::output::{CandlesWriter, OutputWriter};
//! use ohlcv_export::request::{RequestArgs, RequestDescriptor};
//! use ohlcv_export::MarketCategory;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = RequestDescriptor::resolve(
//!     RequestArgs {
//!         symbol: "BTC/USDT",
//!         timeframe: "1h",
//!         since: Some("2024-01-01T00:00:00Z"),
//!         limit: 24,
//!         market: Some("linear"),
//!     },
//!     Utc::now(),
//! )?;
//!
//! let category = MarketCategory::for_market(request.market_type);
//! let fetcher = MarketFetcher::new(BybitClient::new(BybitOptions::new(category))?);
//! let candles = fetcher.fetch(&request).await?;
//!
//! let mut writer = CsvCandlesWriter::new(std::io::stdout().lock())?;
//! writer.write_candles(&candles)?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use std::str::FromStr;

/// CLI entry point and pipeline wiring
pub mod cli;

/// Exchange access and candle conversion
pub mod fetcher;

/// Candle output writers
pub mod output;

/// Argument resolution into a validated request
pub mod request;

/// One OHLCV candle.
///
/// Prices are in the quote currency and volume in the base currency, exactly
/// as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    /// Candle open time
    pub time: DateTime<Utc>,
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

impl Candle {
    /// Open time as Unix milliseconds
    pub fn timestamp_millis(&self) -> i64 {
        self.time.timestamp_millis()
    }
}

/// Market type selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketType {
    /// Spot market
    Spot,
    /// USDT/USDC-margined perpetuals
    Linear,
    /// Coin-margined perpetuals
    Inverse,
}

impl MarketType {
    /// Every accepted market type, in the order they are listed to users
    pub const ALL: [MarketType; 3] = [MarketType::Spot, MarketType::Linear, MarketType::Inverse];

    /// Market category the exchange client is opened with
    pub fn category(&self) -> MarketCategory {
        match self {
            MarketType::Spot => MarketCategory::Spot,
            MarketType::Linear | MarketType::Inverse => MarketCategory::Swap,
        }
    }
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketType::Spot => "spot",
            MarketType::Linear => "linear",
            MarketType::Inverse => "inverse",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MarketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spot" => Ok(MarketType::Spot),
            "linear" => Ok(MarketType::Linear),
            "inverse" => Ok(MarketType::Inverse),
            _ => Err(format!(
                "invalid market type '{s}'. Must be one of: spot, linear, inverse"
            )),
        }
    }
}

/// Market category the exchange client operates in.
///
/// Linear and inverse contracts share the swap category; the exchange client
/// tells them apart from the symbol itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketCategory {
    /// Spot trading pairs
    Spot,
    /// Perpetual swaps
    Swap,
}

impl MarketCategory {
    /// Category for an optional market type, falling back to swap
    pub fn for_market(market_type: Option<MarketType>) -> Self {
        market_type.map_or(MarketCategory::Swap, |market| market.category())
    }

    /// Category name
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketCategory::Spot => "spot",
            MarketCategory::Swap => "swap",
        }
    }
}

impl std::fmt::Display for MarketCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
