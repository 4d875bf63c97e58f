//! CSV output writer implementation
//!
//! Layout: `timestamp,iso_time,open,high,low,close,volume`. The header is
//! written as soon as the writer is created, so an empty candle list still
//! produces it.

use crate::Candle;
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::io::Write;
use tracing::{debug, warn};

use super::{CandlesWriter, OutputError, OutputResult, OutputWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Column names, in output order
pub const HEADER: [&str; 7] = ["timestamp", "iso_time", "open", "high", "low", "close", "volume"];

/// CSV record for one candle
#[derive(Debug, Serialize)]
struct CandleRecord {
    timestamp: i64,
    iso_time: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

impl From<&Candle> for CandleRecord {
    fn from(candle: &Candle) -> Self {
        Self {
            timestamp: candle.timestamp_millis(),
            iso_time: format_iso_time(&candle.time),
            open: format_decimal(candle.open),
            high: format_decimal(candle.high),
            low: format_decimal(candle.low),
            close: format_decimal(candle.close),
            volume: format_decimal(candle.volume),
        }
    }
}

/// Shortest decimal string that round-trips to `value`, never in exponent form.
///
/// `0.0` is `0`, `1e-8` is `0.00000001`, `1e21` is `1000000000000000000000`.
/// Non-finite values render as `NaN`, `inf` and `-inf`.
pub fn format_decimal(value: f64) -> String {
    value.to_string()
}

/// RFC 3339 UTC rendering with a `Z` suffix.
///
/// Fractional seconds appear only when non-zero, so millisecond timestamps
/// survive a parse round-trip while whole-second candles stay short.
pub fn format_iso_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// CSV writer for OHLCV candles over any byte sink
pub struct CsvCandlesWriter<W: Write> {
    writer: Writer<W>,
    candles_written: u64,
}

impl<W: Write> CsvCandlesWriter<W> {
    /// Create a writer and emit the header row
    ///
    /// # Arguments
    /// * `inner` - Destination, typically a locked stdout
    pub fn new(inner: W) -> OutputResult<Self> {
        Self::new_with_buffer_size(inner, DEFAULT_BUFFER_SIZE)
    }

    /// Create a writer with custom buffer size and emit the header row
    pub fn new_with_buffer_size(inner: W, buffer_size: usize) -> OutputResult<Self> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .buffer_capacity(buffer_size)
            .from_writer(inner);

        writer
            .write_record(HEADER)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;

        Ok(Self {
            writer,
            candles_written: 0,
        })
    }

    /// Get number of candles written so far
    pub fn candles_written(&self) -> u64 {
        self.candles_written
    }

    /// Flush and hand back the underlying sink
    pub fn into_inner(mut self) -> OutputResult<W> {
        self.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))
    }
}

impl<W: Write> CandlesWriter for CsvCandlesWriter<W> {
    fn write_candle(&mut self, candle: &Candle) -> OutputResult<()> {
        self.writer
            .serialize(CandleRecord::from(candle))
            .map_err(|e| OutputError::CsvError(format!("Failed to write candle: {e}")))?;

        self.candles_written += 1;
        Ok(())
    }

    /// Write all candles; on failure, push out whatever is already buffered
    fn write_candles(&mut self, candles: &[Candle]) -> OutputResult<()> {
        for candle in candles {
            if let Err(e) = self.write_candle(candle) {
                if let Err(flush_err) = self.flush() {
                    warn!("Flush after write failure also failed: {}", flush_err);
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

impl<W: Write> OutputWriter for CsvCandlesWriter<W> {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }

    fn close(self) -> OutputResult<()> {
        let written = self.candles_written;
        self.into_inner()?;
        debug!("CSV writer closed: {} candles written", written);
        Ok(())
    }
}
