//! Bybit response parser
//!
//! Stateless functions converting Bybit v5 JSON responses into typed values.
//! Every v5 response shares one envelope:
//! `{"retCode": 0, "retMsg": "OK", "result": {...}}`.

use serde_json::Value;

use super::{FetcherError, FetcherResult, OhlcvRecord};

/// Stateless parser for Bybit API responses
pub struct BybitParser;

/// One page of instrument symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentsPage {
    /// Exchange symbol ids on this page
    pub symbols: Vec<String>,
    /// Cursor for the next page, absent on the last one
    pub next_cursor: Option<String>,
}

impl BybitParser {
    /// Check the response envelope and return its `result` object
    ///
    /// # Errors
    /// Returns `FetcherError::ApiError` when `retCode` is non-zero and
    /// `FetcherError::ParseError` when the envelope is malformed
    pub fn result(response: &Value) -> FetcherResult<&Value> {
        let code = response
            .get("retCode")
            .and_then(Value::as_i64)
            .ok_or_else(|| FetcherError::ParseError("Missing or invalid retCode".to_string()))?;

        if code != 0 {
            let message = response
                .get("retMsg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(FetcherError::ApiError { code, message });
        }

        response
            .get("result")
            .ok_or_else(|| FetcherError::ParseError("Missing result".to_string()))
    }

    /// Parse a kline response into records, in the order the exchange listed them
    ///
    /// # Format
    /// `result.list` rows are `[startTime, open, high, low, close, volume, turnover]`,
    /// every element a string.
    pub fn parse_klines(response: &Value) -> FetcherResult<Vec<OhlcvRecord>> {
        let list = Self::result(response)?
            .get("list")
            .and_then(Value::as_array)
            .ok_or_else(|| FetcherError::ParseError("Missing or invalid result.list".to_string()))?;

        let mut records = Vec::with_capacity(list.len());
        for row in list {
            let fields = row
                .as_array()
                .ok_or_else(|| FetcherError::ParseError("Kline is not an array".to_string()))?;

            if fields.len() < 6 {
                return Err(FetcherError::ParseError(format!(
                    "Expected at least 6 elements in kline, got {}",
                    fields.len()
                )));
            }

            records.push(OhlcvRecord {
                timestamp: Self::parse_i64(&fields[0], "startTime")?,
                open: Self::parse_f64(&fields[1], "open")?,
                high: Self::parse_f64(&fields[2], "high")?,
                low: Self::parse_f64(&fields[3], "low")?,
                close: Self::parse_f64(&fields[4], "close")?,
                volume: Self::parse_f64(&fields[5], "volume")?,
            });
        }

        Ok(records)
    }

    /// Parse one page of an instruments-info response
    pub fn parse_instruments(response: &Value) -> FetcherResult<InstrumentsPage> {
        let result = Self::result(response)?;
        let list = result
            .get("list")
            .and_then(Value::as_array)
            .ok_or_else(|| FetcherError::ParseError("Missing or invalid result.list".to_string()))?;

        let symbols = list
            .iter()
            .map(|item| {
                item.get("symbol")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| FetcherError::ParseError("Missing or invalid symbol".to_string()))
            })
            .collect::<FetcherResult<Vec<_>>>()?;

        let next_cursor = result
            .get("nextPageCursor")
            .and_then(Value::as_str)
            .filter(|cursor| !cursor.is_empty())
            .map(str::to_string);

        Ok(InstrumentsPage {
            symbols,
            next_cursor,
        })
    }

    /// Numbers arrive as strings; plain JSON numbers are accepted too
    fn parse_f64(value: &Value, field: &str) -> FetcherResult<f64> {
        match value {
            Value::String(s) => s
                .parse::<f64>()
                .map_err(|e| FetcherError::ParseError(format!("Invalid {field} '{s}': {e}"))),
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| FetcherError::ParseError(format!("Invalid {field}: {n}"))),
            _ => Err(FetcherError::ParseError(format!("Invalid {field}: {value}"))),
        }
    }

    fn parse_i64(value: &Value, field: &str) -> FetcherResult<i64> {
        match value {
            Value::String(s) => s
                .parse::<i64>()
                .map_err(|e| FetcherError::ParseError(format!("Invalid {field} '{s}': {e}"))),
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| FetcherError::ParseError(format!("Invalid {field}: {n}"))),
            _ => Err(FetcherError::ParseError(format!("Invalid {field}: {value}"))),
        }
    }
}
