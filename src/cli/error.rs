//! CLI error types and conversions

use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::request::RequestError;

/// CLI errors. Every variant is fatal.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Malformed or missing command-line input
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] RequestError),

    /// Exchange request failed
    #[error("fetch error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Writing CSV failed
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),
}
