//! Main entry point for the ohlcv-export CLI

use clap::Parser;
use ohlcv_export::cli::{normalize_flag_args, Cli};
use tracing_subscriber::EnvFilter;

/// Initialize tracing on stderr with optional JSON formatting.
///
/// Stdout carries the CSV, so logs never go there.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ohlcv_export=warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse_from(normalize_flag_args(std::env::args_os()));

    if let Err(e) = cli.execute().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
