//! Shared test doubles: an in-process Bybit REST mock and in-memory OHLCV sources

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ohlcv_export::fetcher::{FetcherError, FetcherResult, OhlcvRecord, OhlcvSource};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Symbol the mock answers with an API error
pub const API_ERROR_SYMBOL: &str = "FAILUSDT";

/// Symbol the mock answers with HTTP 500
pub const SERVER_ERROR_SYMBOL: &str = "BOOMUSDT";

/// One request seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
}

impl RecordedRequest {
    pub fn params(&self) -> HashMap<String, String> {
        reqwest::Url::parse(&format!("http://mock/?{}", self.query))
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// Requests recorded by a running mock
#[derive(Clone, Default)]
pub struct MockBybit {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    stuck_cursor: Arc<AtomicBool>,
}

impl MockBybit {
    /// Make every spot instruments page hand back the same non-empty cursor
    pub fn repeat_spot_cursor(&self) {
        self.stuck_cursor.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    fn record(&self, path: &str, query: Option<String>, headers: HeaderMap) -> RecordedRequest {
        let request = RecordedRequest {
            path: path.to_string(),
            query: query.unwrap_or_default(),
            headers,
        };
        self.requests.lock().unwrap().push(request.clone());
        request
    }
}

/// Three one-minute candles from 2024-01-01T00:00:00Z, newest first as Bybit lists them
pub fn kline_rows() -> Value {
    json!([
        ["1704067320000", "42050", "42080", "42040", "42070", "3.5", "147245"],
        ["1704067260000", "42010.5", "42060", "42000", "42050", "2.25", "94612.5"],
        ["1704067200000", "42000", "42020", "41990", "42010.5", "1.125", "47261.8"]
    ])
}

async fn kline(
    State(mock): State<MockBybit>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let request = mock.record("/v5/market/kline", query, headers);
    let params = request.params();
    let symbol = params.get("symbol").cloned().unwrap_or_default();

    match symbol.as_str() {
        API_ERROR_SYMBOL => Json(json!({
            "retCode": 10001,
            "retMsg": "params error: symbol invalid",
            "result": {},
        }))
        .into_response(),
        SERVER_ERROR_SYMBOL => (StatusCode::INTERNAL_SERVER_ERROR, "upstream down").into_response(),
        _ => Json(json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": params.get("category"),
                "symbol": symbol,
                "list": kline_rows(),
            },
        }))
        .into_response(),
    }
}

async fn instruments(
    State(mock): State<MockBybit>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Json<Value> {
    let request = mock.record("/v5/market/instruments-info", query, headers);
    let params = request.params();

    let (symbols, next) = match (
        params.get("category").map(String::as_str),
        params.get("cursor").map(String::as_str),
    ) {
        (Some("linear"), None) => (vec!["BTCUSDT"], "page2"),
        (Some("linear"), Some("page2")) => (vec!["ETHUSDT"], ""),
        (Some("inverse"), _) => (vec!["BTCUSD"], ""),
        (Some("spot"), _) if mock.stuck_cursor.load(Ordering::SeqCst) => {
            (vec!["BTCUSDT", "ETHUSDT"], "again")
        }
        (Some("spot"), _) => (vec!["BTCUSDT", "ETHUSDT"], ""),
        _ => (vec![], ""),
    };

    let list: Vec<Value> = symbols
        .into_iter()
        .map(|symbol| json!({ "symbol": symbol, "status": "Trading" }))
        .collect();

    Json(json!({
        "retCode": 0,
        "retMsg": "OK",
        "result": {
            "category": params.get("category"),
            "list": list,
            "nextPageCursor": next,
        },
    }))
}

/// Start the mock on an ephemeral port; returns its base URL and request log
pub async fn spawn_mock_bybit() -> (String, MockBybit) {
    let mock = MockBybit::default();
    let router = Router::new()
        .route("/v5/market/kline", get(kline))
        .route("/v5/market/instruments-info", get(instruments))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}"), mock)
}

/// Source returning a fixed list of records
pub struct StaticSource {
    pub records: Vec<OhlcvRecord>,
    pub calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(records: Vec<OhlcvRecord>) -> Self {
        Self {
            records,
            calls: AtomicUsize::new(0),
        }
    }

    /// `count` one-minute records starting at `start_ms`
    pub fn minutes(start_ms: i64, count: usize) -> Self {
        let records = (0..count)
            .map(|i| {
                let base = 100.0 + i as f64;
                OhlcvRecord {
                    timestamp: start_ms + i as i64 * 60_000,
                    open: base,
                    high: base + 0.5,
                    low: base - 0.5,
                    close: base + 0.25,
                    volume: 1.0 + i as f64,
                }
            })
            .collect();
        Self::new(records)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OhlcvSource for StaticSource {
    async fn load_markets(&self) -> FetcherResult<usize> {
        Ok(1)
    }

    async fn fetch_ohlcv(
        &self,
        _symbol: &str,
        _timeframe: &str,
        _since: i64,
        _limit: u32,
    ) -> FetcherResult<Vec<OhlcvRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }
}

/// Source that always fails
pub struct FailingSource;

#[async_trait]
impl OhlcvSource for FailingSource {
    async fn load_markets(&self) -> FetcherResult<usize> {
        Err(FetcherError::NetworkError("connection refused".to_string()))
    }

    async fn fetch_ohlcv(
        &self,
        _symbol: &str,
        _timeframe: &str,
        _since: i64,
        _limit: u32,
    ) -> FetcherResult<Vec<OhlcvRecord>> {
        Err(FetcherError::ApiError {
            code: 10001,
            message: "params error".to_string(),
        })
    }
}
