use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

use crate::parser::ObservationRow;
use crate::stations::StationSet;

/// `ValidDate` and `ValidTime` joined by a single space.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M";

/// A filtered observation with its parsed timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub site_name: String,
    pub pm25: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// A station-of-interest row that could not be turned into a [`Reading`].
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub row: ObservationRow,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Validated {
    pub readings: Vec<Reading>,
    pub rejected: Vec<RejectedRow>,
    /// Rows dropped because their station is not in the set.
    pub filtered_out: usize,
}

/// Parses `"MM/DD/YYYY"` + `"HH:MM"` as a UTC timestamp.
pub fn parse_timestamp(date: &str, time: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let joined = format!("{date} {time}");
    NaiveDateTime::parse_from_str(&joined, TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

/// Splits raw rows into readings for the stations of interest and rejected rows.
///
/// Input order is preserved in both outputs.
pub fn validate(rows: Vec<ObservationRow>, stations: &StationSet) -> Validated {
    let mut validated = Validated::default();

    for row in rows {
        if !stations.contains(&row.aqsid) {
            validated.filtered_out += 1;
            continue;
        }

        match parse_timestamp(&row.valid_date, &row.valid_time) {
            Ok(timestamp) => validated.readings.push(Reading {
                site_name: row.site_name,
                pm25: row.pm25,
                timestamp,
            }),
            Err(e) => {
                debug!(
                    aqsid = %row.aqsid,
                    date = %row.valid_date,
                    time = %row.valid_time,
                    error = %e,
                    "Rejecting row with unparseable timestamp"
                );
                validated.rejected.push(RejectedRow {
                    reason: format!("invalid timestamp '{} {}': {}", row.valid_date, row.valid_time, e),
                    row,
                });
            }
        }
    }

    validated
}
