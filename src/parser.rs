//! CSV parser for AirNow hourly observation tables (`HourlyAQObs_*.dat`).

use csv::{ReaderBuilder, Terminator};
use serde::Deserialize;
use thiserror::Error;

/// Columns every hourly table must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = ["AQSID", "SiteName", "ValidDate", "ValidTime", "PM25"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// One measurement row of an hourly observation table.
///
/// Only the columns the report uses are kept; the rest of the file's
/// columns are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObservationRow {
    #[serde(rename = "AQSID")]
    pub aqsid: String,
    #[serde(rename = "SiteName")]
    pub site_name: String,
    /// `MM/DD/YYYY`
    #[serde(rename = "ValidDate")]
    pub valid_date: String,
    /// `HH:MM`
    #[serde(rename = "ValidTime")]
    pub valid_time: String,
    /// µg/m³; `None` when the station did not report PM2.5 this hour.
    #[serde(rename = "PM25")]
    pub pm25: Option<f64>,
}

/// Decodes an hourly observation table from raw bytes.
///
/// # Errors
///
/// Returns an error if the header lacks a required column, a record is
/// structurally broken, or `PM25` is present but not numeric.
pub fn parse_hourly_table(bytes: &[u8]) -> Result<Vec<ObservationRow>, TableError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .terminator(Terminator::CRLF)
        .from_reader(bytes);

    let headers = reader.headers()?;
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|name| !headers.iter().any(|h| h == **name))
    {
        return Err(TableError::MissingColumn(*missing));
    }

    Ok(reader
        .deserialize::<ObservationRow>()
        .collect::<Result<Vec<_>, _>>()?)
}
