//! Candle output writers

use crate::Candle;

pub mod csv;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to the underlying sink
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Trait for writing OHLCV candles
pub trait CandlesWriter: OutputWriter {
    /// Write a single candle to output
    fn write_candle(&mut self, candle: &Candle) -> OutputResult<()>;

    /// Write multiple candles at once
    fn write_candles(&mut self, candles: &[Candle]) -> OutputResult<()> {
        for candle in candles {
            self.write_candle(candle)?;
        }
        Ok(())
    }
}
