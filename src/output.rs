//! Output locations and CSV export of the processed views.

use chrono::{DateTime, SecondsFormat, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ReportError;
use crate::process::{AverageView, WideView};

pub const DEFAULT_OUTPUT_DIR: &str = "resources";
pub const PNG_FILE_NAME: &str = "report.png";
pub const PDF_FILE_NAME: &str = "report.pdf";
pub const WIDE_CSV_FILE_NAME: &str = "report_by_station.csv";
pub const AVERAGE_CSV_FILE_NAME: &str = "report_average.csv";

/// Creates `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), ReportError> {
    debug!(dir = %dir.display(), "Ensuring output directory");
    std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))
}

#[derive(Serialize)]
struct AverageRecord {
    timestamp: DateTime<Utc>,
    pm25: Option<f64>,
}

fn csv_error(path: &Path, e: csv::Error) -> ReportError {
    let source = match e.into_kind() {
        csv::ErrorKind::Io(io) => io,
        other => std::io::Error::other(format!("{other:?}")),
    };
    ReportError::io(path, source)
}

fn create(path: &Path) -> Result<File, ReportError> {
    File::create(path).map_err(|e| ReportError::io(path, e))
}

/// Writes the average view as `timestamp,pm25` rows. Missing values are empty.
pub fn write_average_csv(path: &Path, average: &AverageView) -> Result<(), ReportError> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(create(path)?);

    for (timestamp, pm25) in &average.points {
        writer
            .serialize(AverageRecord {
                timestamp: *timestamp,
                pm25: *pm25,
            })
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| ReportError::io(path, e))
}

/// Writes the wide view with a `timestamp` column followed by one column per station.
pub fn write_wide_csv(path: &Path, wide: &WideView) -> Result<(), ReportError> {
    let mut writer = WriterBuilder::new().from_writer(create(path)?);

    let header = std::iter::once("timestamp").chain(wide.stations.iter().map(String::as_str));
    writer.write_record(header).map_err(|e| csv_error(path, e))?;

    for (timestamp, row) in wide.timestamps.iter().zip(&wide.values) {
        let record = std::iter::once(timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
            .chain(row.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
        writer.write_record(record).map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| ReportError::io(path, e))
}

/// Writes both views into `dir`, returning the `(wide, average)` paths.
pub fn write_views_csv(
    dir: &Path,
    wide: &WideView,
    average: &AverageView,
) -> Result<(PathBuf, PathBuf), ReportError> {
    ensure_dir(dir)?;

    let wide_path = dir.join(WIDE_CSV_FILE_NAME);
    let average_path = dir.join(AVERAGE_CSV_FILE_NAME);

    write_wide_csv(&wide_path, wide)?;
    write_average_csv(&average_path, average)?;

    info!(
        wide = %wide_path.display(),
        average = %average_path.display(),
        "CSV export written"
    );
    Ok((wide_path, average_path))
}
