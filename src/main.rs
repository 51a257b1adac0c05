//! CLI entry point for the motel bid normalizer.
//!
//! Loads the bid, exchange-rate and motel feeds, runs the normalization
//! pipeline, writes the error report and prints the normalized bids.

use std::ffi::OsStr;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use motel_bids::config::PipelineConfig;
use motel_bids::loader::{load_bids, load_motels, load_rates};
use motel_bids::normalize::{self, Tables};
use motel_bids::output::{CsvErrorSink, print_json, print_pretty, write_normalized};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "motel_bids")]
#[command(about = "Normalizes motel bids into a single reference currency", long_about = None)]
struct Cli {
    /// Headerless bids CSV
    #[arg(short = 'b', long = "bids", visible_alias = "sb", value_name = "FILE")]
    bids_path: String,

    /// Headerless exchange rate CSV
    #[arg(
        short = 'e',
        long = "exchange-rate",
        visible_alias = "se",
        alias = "exchange_rate",
        value_name = "FILE"
    )]
    exchange_rate_path: String,

    /// Headerless motels CSV
    #[arg(short = 'm', long = "motels", visible_alias = "sm", value_name = "FILE")]
    motels_path: String,

    /// CSV file the error report is written to
    #[arg(long, default_value = "errors.csv")]
    errors: String,

    /// Optional CSV file for the normalized bids (printed to stdout otherwise)
    #[arg(short, long)]
    output: Option<String>,

    /// Optional JSON pipeline config (marker column, country allow-list)
    #[arg(short, long)]
    config: Option<String>,

    /// Log the normalized bids as JSON instead of printing a table
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/motel_bids.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("motel_bids.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    info!(
        marker_column = %config.marker_column,
        countries = ?config.countries,
        "Pipeline configured"
    );

    let tables = Tables {
        bids: load_bids(&cli.bids_path)?,
        rates: load_rates(&cli.exchange_rate_path)?,
        motels: load_motels(&cli.motels_path)?,
    };

    let mut sink = CsvErrorSink::create(&cli.errors)?;

    let output = match normalize::run(tables, &config, &mut sink) {
        Ok(output) => output,
        Err(e) => {
            error!(stage = %e.stage(), row = ?e.row(), error = %e, "Pipeline aborted");
            return Err(e.into());
        }
    };

    info!(
        bids = output.counts.bids,
        rates = output.counts.rates,
        motels = output.counts.motels,
        "Input row counts"
    );
    info!(
        rejected = output.rejected,
        dropped = output.dropped,
        normalized = output.bids.len(),
        error_report = %cli.errors,
        error_report_rows = sink.rows(),
        "Normalization finished"
    );

    print_pretty(&output.bids);

    if let Some(path) = &cli.output {
        let file = File::create(path).with_context(|| format!("creating output '{path}'"))?;
        write_normalized(file, &output.bids)?;
        info!(path = %path, rows = output.bids.len(), "Normalized bids written");
    } else if cli.json {
        print_json(&output.bids)?;
    } else {
        write_normalized(std::io::stdout().lock(), &output.bids)?;
    }

    Ok(())
}
