//! Logging goes to stderr and never mixes with the CSV on stdout

use assert_cmd::Command;
use ohlcv_export::fetcher::bybit_config::{API_KEY_ENV, API_SECRET_ENV, BASE_URL_ENV};
use std::process::Output;

use crate::support::spawn_mock_bybit;

async fn run_with_logging(log_format: Option<&'static str>) -> Output {
    let (base_url, _mock) = spawn_mock_bybit().await;

    tokio::task::spawn_blocking(move || {
        let mut cmd = Command::cargo_bin("ohlcv-export").unwrap();
        cmd.env_remove(API_KEY_ENV)
            .env_remove(API_SECRET_ENV)
            .env_remove(BASE_URL_ENV)
            .env("RUST_LOG", "ohlcv_export=debug");
        match log_format {
            Some(format) => cmd.env("LOG_FORMAT", format),
            None => cmd.env_remove("LOG_FORMAT"),
        };
        cmd.args([
            "-symbol",
            "BTC/USDT",
            "-since",
            "2024-01-01T00:00:00Z",
            "-limit",
            "3",
            "-preload-markets",
            "-base-url",
            base_url.as_str(),
        ])
        .output()
        .unwrap()
    })
    .await
    .unwrap()
}

fn assert_pure_csv(stdout: &[u8]) {
    let stdout = String::from_utf8(stdout.to_vec()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "timestamp,iso_time,open,high,low,close,volume");
    for line in &lines[1..] {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 7, "unexpected line on stdout: {line}");
        assert!(fields[0].parse::<i64>().is_ok(), "unexpected line on stdout: {line}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_debug_logs_stay_on_stderr() {
    let output = run_with_logging(None).await;

    assert!(output.status.success());
    assert_pure_csv(&output.stdout);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Fetching OHLCV"));
    assert!(stderr.contains("Preloaded 3 markets"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_json_logs_stay_on_stderr() {
    let output = run_with_logging(Some("json")).await;

    assert!(output.status.success());
    assert_pure_csv(&output.stdout);

    let stderr = String::from_utf8_lossy(&output.stderr);
    let first = stderr.lines().next().unwrap();
    let event: serde_json::Value = serde_json::from_str(first).unwrap();
    assert!(event.get("level").is_some());
    assert!(event.get("fields").is_some());
}
