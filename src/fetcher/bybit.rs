//! Bybit v5 OHLCV source
//!
//! Accepts unified symbols (`BTC/USDT`, `BTC/USDT:USDT`, `BTC/USD:BTC`) as well
//! as native ids (`BTCUSDT`). The swap category is split into Bybit's
//! `linear` and `inverse` categories by looking at the symbol.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

use super::bybit_config::{
    interval_code, timeframe_millis, BybitOptions, INSTRUMENTS_ENDPOINT, INSTRUMENTS_PAGE_LIMIT,
    KLINE_ENDPOINT,
};
use super::bybit_http::BybitHttpClient;
use super::bybit_parser::BybitParser;
use super::{FetcherError, FetcherResult, OhlcvRecord, OhlcvSource};
use crate::MarketCategory;

/// Exchange symbol id for a unified or native symbol
///
/// Drops the settle suffix and the slash: `BTC/USDT:USDT` becomes `BTCUSDT`.
pub fn market_id(symbol: &str) -> String {
    let pair = symbol.split_once(':').map_or(symbol, |(pair, _)| pair);
    pair.trim().replace('/', "").to_uppercase()
}

/// Bybit category for a symbol within a market category
pub fn resolve_category(category: MarketCategory, symbol: &str) -> &'static str {
    match category {
        MarketCategory::Spot => "spot",
        MarketCategory::Swap if is_inverse(symbol) => "inverse",
        MarketCategory::Swap => "linear",
    }
}

/// Bybit categories covered by a market category
fn categories(category: MarketCategory) -> &'static [&'static str] {
    match category {
        MarketCategory::Spot => &["spot"],
        MarketCategory::Swap => &["linear", "inverse"],
    }
}

/// Coin-margined contracts settle in the base coin and quote in USD
fn is_inverse(symbol: &str) -> bool {
    let symbol = symbol.trim().to_uppercase();
    let (pair, settle) = match symbol.split_once(':') {
        Some((pair, settle)) => (pair, Some(settle)),
        None => (symbol.as_str(), None),
    };

    match (pair.split_once('/'), settle) {
        (Some((base, _)), Some(settle)) => base == settle,
        (Some((_, quote)), None) => quote == "USD",
        (None, _) => is_usd_quoted_id(pair),
    }
}

/// Native id quoted in USD: perpetual `BTCUSD` or dated `BTCUSDH25`
fn is_usd_quoted_id(id: &str) -> bool {
    let Some(pos) = id.rfind("USD") else {
        return false;
    };
    if pos == 0 {
        return false;
    }

    match id[pos + 3..].as_bytes() {
        [] => true,
        [month, y1, y2] => {
            month.is_ascii_uppercase() && y1.is_ascii_digit() && y2.is_ascii_digit()
        }
        _ => false,
    }
}

/// OHLCV source backed by the Bybit v5 REST API
pub struct BybitClient {
    http: BybitHttpClient,
    category: MarketCategory,
    markets: RwLock<Option<HashSet<String>>>,
}

impl BybitClient {
    /// Create a client from options
    pub fn new(options: BybitOptions) -> FetcherResult<Self> {
        let http = BybitHttpClient::new(&options)?;
        debug!(
            "Bybit client: base_url={} category={} authenticated={}",
            http.base_url(),
            options.category,
            http.is_authenticated()
        );
        Ok(Self {
            http,
            category: options.category,
            markets: RwLock::new(None),
        })
    }

    /// Market category this client was opened with
    pub fn category(&self) -> MarketCategory {
        self.category
    }

    /// Whether market metadata has been loaded
    pub fn markets_loaded(&self) -> bool {
        self.markets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn load_category(&self, category: &str) -> FetcherResult<Vec<String>> {
        let mut symbols = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = vec![
                ("category", category.to_string()),
                ("limit", INSTRUMENTS_PAGE_LIMIT.to_string()),
            ];
            if let Some(cursor) = &cursor {
                params.push(("cursor", cursor.clone()));
            }

            let response: Value = self.http.get(INSTRUMENTS_ENDPOINT, &params).await?;
            let page = BybitParser::parse_instruments(&response)?;
            let page_len = page.symbols.len();
            symbols.extend(page.symbols);

            match page.next_cursor {
                Some(next) if page_len > 0 && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next)
                }
                Some(_) if page_len > 0 => {
                    warn!("Instruments cursor did not advance for {}; stopping", category);
                    break;
                }
                _ => break,
            }
        }

        debug!("Loaded {} {} instruments", symbols.len(), category);
        Ok(symbols)
    }

    fn ensure_known(&self, symbol: &str, id: &str) -> FetcherResult<()> {
        let markets = self.markets.read().unwrap_or_else(PoisonError::into_inner);
        match markets.as_ref() {
            Some(known) if !known.contains(id) => {
                Err(FetcherError::UnknownSymbol(symbol.to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl OhlcvSource for BybitClient {
    async fn load_markets(&self) -> FetcherResult<usize> {
        let mut known = HashSet::new();
        for category in categories(self.category) {
            known.extend(self.load_category(category).await?);
        }

        let count = known.len();
        *self.markets.write().unwrap_or_else(PoisonError::into_inner) = Some(known);
        info!("Loaded {} markets for category {}", count, self.category);
        Ok(count)
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        since: i64,
        limit: u32,
    ) -> FetcherResult<Vec<OhlcvRecord>> {
        let interval = interval_code(timeframe)
            .ok_or_else(|| FetcherError::UnsupportedTimeframe(timeframe.to_string()))?;

        let id = market_id(symbol);
        self.ensure_known(symbol, &id)?;

        let mut params = vec![
            ("category", resolve_category(self.category, symbol).to_string()),
            ("symbol", id),
            ("interval", interval.to_string()),
            ("start", since.to_string()),
        ];
        // Without an end, Bybit returns the newest candles rather than those after `start`
        if let Some(step) = timeframe_millis(timeframe) {
            let end = since
                .saturating_add(step.saturating_mul(i64::from(limit)))
                .saturating_sub(1);
            params.push(("end", end.to_string()));
        }
        params.push(("limit", limit.to_string()));

        let response: Value = self.http.get(KLINE_ENDPOINT, &params).await?;
        let mut records = BybitParser::parse_klines(&response)?;

        // Bybit lists newest first
        records.sort_by_key(|record| record.timestamp);
        Ok(records)
    }
}
