//! CLI entry point for the PM2.5 report.
//!
//! With no arguments, fetches the last 24 published hours of AirNow
//! observations, filters them to the Cambridge, MA stations and writes
//! `resources/report.png` and `resources/report.pdf`.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use pm25_report::{
    fetch::{ArchiveSource, BasicClient, HourlySource, MAX_CONCURRENCY, MissingHourPolicy},
    pipeline::{DEFAULT_CONCURRENCY, DEFAULT_HOURS, ReportConfig, run},
    stations::StationSet,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "pm25_report")]
#[command(about = "Plot recent PM2.5 readings for a set of AirNow stations", long_about = None)]
struct Cli {
    /// Number of hourly tables to fetch
    #[arg(long, default_value_t = DEFAULT_HOURS)]
    hours: usize,

    /// Directory the report files are written to
    #[arg(short, long, default_value = "resources")]
    output_dir: PathBuf,

    /// JSON file with an array of station ids (AQSID) to report on
    #[arg(long, value_name = "FILE")]
    stations: Option<PathBuf>,

    /// Maximum number of concurrent archive downloads
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Continue without hours that are not published yet instead of failing
    #[arg(long, default_value_t = false)]
    skip_missing: bool,

    /// Retries per hour after a failed download
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Seconds between retries
    #[arg(long, default_value_t = 30)]
    retry_delay_secs: u64,

    /// Also write the processed views as CSV next to the charts
    #[arg(long, default_value_t = false)]
    export_csv: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/pm25_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("pm25_report.log"));

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

    let stations = match &cli.stations {
        Some(path) => StationSet::load(path)
            .with_context(|| format!("loading station list from {}", path.display()))?,
        None => StationSet::default(),
    };

    if cli.concurrency > MAX_CONCURRENCY {
        warn!(
            requested = cli.concurrency,
            max = MAX_CONCURRENCY,
            "Concurrency capped"
        );
    }

    let config = ReportConfig {
        hours: cli.hours,
        stations,
        output_dir: cli.output_dir,
        concurrency: cli.concurrency,
        missing_hours: if cli.skip_missing {
            MissingHourPolicy::Skip
        } else {
            MissingHourPolicy::Fail
        },
        export_csv: cli.export_csv,
    };

    info!(
        hours = config.hours,
        stations = config.stations.len(),
        concurrency = config.concurrency,
        policy = ?config.missing_hours,
        "Starting PM2.5 report"
    );

    let client = BasicClient::new().context("building HTTP client")?;
    let source: Arc<dyn HourlySource> = Arc::new(
        ArchiveSource::new(client)
            .with_retries(cli.retries, Duration::from_secs(cli.retry_delay_secs)),
    );

    let outcome = run(&config, source, Utc::now())
        .await
        .context("PM2.5 report run failed")?;

    if !outcome.missing_hours.is_empty() {
        warn!(
            missing = outcome.missing_hours.len(),
            "Report built without some hours"
        );
    }

    info!(
        png = %outcome.rendered.png.display(),
        pdf = %outcome.rendered.pdf.display(),
        timestamps = outcome.views.wide.row_count(),
        stations = outcome.views.wide.column_count(),
        rejected = outcome.views.rejected.len(),
        "Report complete"
    );

    Ok(())
}
