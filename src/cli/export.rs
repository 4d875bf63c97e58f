//! Export command implementation

use crate::fetcher::bybit::BybitClient;
use crate::fetcher::bybit_config::{BybitOptions, ExchangeCredentials, BASE_URL_ENV, TESTNET_BASE_URL};
use crate::fetcher::{MarketFetcher, OhlcvSource};
use crate::output::csv::CsvCandlesWriter;
use crate::output::{CandlesWriter, OutputWriter};
use crate::request::{
    RequestArgs, RequestDescriptor, DEFAULT_LIMIT, DEFAULT_MARKET, DEFAULT_TIMEFRAME,
};
use crate::MarketCategory;
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::io::Write;
use tracing::info;

use super::CliError;

/// OHLCV export CLI
#[derive(Parser, Debug)]
#[command(name = "ohlcv-export")]
#[command(about = "Dump historical OHLCV candles from Bybit as CSV on stdout", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Trading pair symbol (e.g., BTC/USDT)
    #[arg(long, default_value = "")]
    pub symbol: String,

    /// Timeframe (e.g., 1m, 5m, 1h)
    #[arg(long, default_value = DEFAULT_TIMEFRAME)]
    pub timeframe: String,

    /// Start time in RFC3339 format (default: 1 hour ago)
    #[arg(long)]
    pub since: Option<String>,

    /// Maximum number of candles to fetch
    #[arg(long, default_value_t = DEFAULT_LIMIT, allow_negative_numbers = true)]
    pub limit: i64,

    /// Market type: spot, linear, or inverse
    #[arg(long, default_value = DEFAULT_MARKET)]
    pub market: String,

    /// Load the exchange instrument list before fetching and reject unknown symbols
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        require_equals = true
    )]
    pub preload_markets: bool,

    /// Use the Bybit testnet
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        require_equals = true
    )]
    pub testnet: bool,

    /// REST base URL; takes precedence over --testnet
    #[arg(long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,
}

impl Cli {
    /// Resolve the flags into a validated request
    pub fn request(&self, now: DateTime<Utc>) -> Result<RequestDescriptor, CliError> {
        let request = RequestDescriptor::resolve(
            RequestArgs {
                symbol: &self.symbol,
                timeframe: &self.timeframe,
                since: self.since.as_deref(),
                limit: self.limit,
                market: Some(&self.market),
            },
            now,
        )?;
        Ok(request)
    }

    /// Exchange client options for a category and credentials
    pub fn bybit_options(
        &self,
        category: MarketCategory,
        credentials: ExchangeCredentials,
    ) -> BybitOptions {
        let options = BybitOptions::new(category).with_credentials(credentials);
        match (&self.base_url, self.testnet) {
            (Some(base_url), _) => options.with_base_url(base_url.as_str()),
            (None, true) => options.with_base_url(TESTNET_BASE_URL),
            (None, false) => options,
        }
    }

    /// Run the export: resolve, fetch, write CSV to stdout
    pub async fn execute(&self) -> Result<(), CliError> {
        let request = self.request(Utc::now())?;

        let credentials = ExchangeCredentials::from_env();
        let category = MarketCategory::for_market(request.market_type);
        let client = BybitClient::new(self.bybit_options(category, credentials))?;
        let fetcher = MarketFetcher::new(client).with_preload_markets(self.preload_markets);

        let rows = run_export(&request, &fetcher, std::io::stdout().lock()).await?;
        info!("Export complete: {} candles for {}", rows, request.symbol);
        Ok(())
    }
}

/// Fetch candles for `request` and write them as CSV to `out`.
///
/// Nothing is written until the fetch has succeeded.
///
/// # Returns
/// Number of data rows written
pub async fn run_export<S, W>(
    request: &RequestDescriptor,
    fetcher: &MarketFetcher<S>,
    out: W,
) -> Result<usize, CliError>
where
    S: OhlcvSource,
    W: Write,
{
    let candles = fetcher.fetch(request).await?;

    let mut writer = CsvCandlesWriter::new(out)?;
    writer.write_candles(&candles)?;
    writer.close()?;

    Ok(candles.len())
}

/// Accept Go-style single-dash long flags.
///
/// `-symbol BTC/USDT` and `-limit=5` become `--symbol BTC/USDT` and
/// `--limit=5`. Short flags (`-h`), negative numbers and anything after `--`
/// pass through untouched. The first element is the program name.
pub fn normalize_flag_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();
    let mut passthrough = false;

    for arg in args {
        if !passthrough {
            if arg == "--" {
                passthrough = true;
            } else if let Some(flag) = arg.to_str().filter(|s| is_single_dash_long_flag(s)) {
                normalized.push(format!("-{flag}").into());
                continue;
            }
        }
        normalized.push(arg);
    }

    normalized
}

fn is_single_dash_long_flag(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);

    name.len() > 1
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
