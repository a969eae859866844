//! Reshaping of raw hourly observations into the two report views.
//!
//! Raw rows are validated against the station set (see [`validate`]), sorted
//! by timestamp, then reduced to a cross-station average ([`AverageView`])
//! and a per-station pivot ([`WideView`]).

pub mod utility;
pub mod validate;
pub mod views;

pub use validate::{Reading, RejectedRow, Validated, parse_timestamp, validate};
pub use views::{AverageView, WideView, average_view, wide_view};

use tracing::{info, warn};

use crate::error::ReportError;
use crate::parser::ObservationRow;
use crate::stations::StationSet;

/// Output of [`process`].
#[derive(Debug, Default)]
pub struct ProcessedViews {
    pub wide: WideView,
    pub average: AverageView,
    /// Station-of-interest rows excluded because their timestamp did not parse.
    pub rejected: Vec<RejectedRow>,
    pub filtered_out: usize,
}

/// Filters `rows` to `stations` and builds both views, sorted by timestamp.
///
/// Rows with an unparseable date/time are excluded and returned in
/// [`ProcessedViews::rejected`].
///
/// # Errors
///
/// Fails with [`ReportError::DuplicateReading`] when the input holds two
/// readings for the same station at the same timestamp.
pub fn process(rows: Vec<ObservationRow>, stations: &StationSet) -> Result<ProcessedViews, ReportError> {
    let total = rows.len();
    let Validated {
        mut readings,
        rejected,
        filtered_out,
    } = validate(rows, stations);

    if !rejected.is_empty() {
        warn!(
            rejected = rejected.len(),
            first_reason = %rejected[0].reason,
            "Dropped rows with unparseable timestamps"
        );
    }

    // stable: equal timestamps keep input order
    readings.sort_by_key(|r| r.timestamp);

    let average = average_view(&readings);
    let wide = wide_view(&readings)?;

    info!(
        total_rows = total,
        filtered_out,
        rejected = rejected.len(),
        readings = readings.len(),
        timestamps = wide.row_count(),
        stations = wide.column_count(),
        "Observations processed"
    );

    Ok(ProcessedViews {
        wide,
        average,
        rejected,
        filtered_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::CAMBRIDGE_STATIONS;
    use chrono::{TimeZone, Utc};

    fn row(aqsid: &str, site: &str, date: &str, time: &str, pm25: f64) -> ObservationRow {
        ObservationRow {
            aqsid: aqsid.to_string(),
            site_name: site.to_string(),
            valid_date: date.to_string(),
            valid_time: time.to_string(),
            pm25: Some(pm25),
        }
    }

    #[test]
    fn test_single_hour_all_stations_round_trip() {
        let rows: Vec<_> = CAMBRIDGE_STATIONS
            .iter()
            .enumerate()
            .map(|(i, id)| row(id, &format!("Site {i}"), "03/05/2024", "07:00", i as f64 + 0.5))
            .collect();

        let views = process(rows, &StationSet::default()).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 7, 0, 0).unwrap();

        assert_eq!(views.wide.row_count(), 1);
        assert_eq!(views.wide.column_count(), 5);
        for i in 0..5 {
            assert_eq!(views.wide.get(ts, &format!("Site {i}")), Some(i as f64 + 0.5));
        }
        assert_eq!(views.average.points, vec![(ts, Some(2.5))]);
    }

    #[test]
    fn test_only_member_stations_appear() {
        let rows = vec![
            row("250250002", "Kenmore", "03/05/2024", "07:00", 4.0),
            row("999999999", "Elsewhere", "03/05/2024", "07:00", 400.0),
            row("250250042", "Roxbury", "03/05/2024", "08:00", 6.0),
            row("999999999", "Elsewhere", "03/05/2024", "08:00", 400.0),
        ];

        let views = process(rows, &StationSet::default()).unwrap();
        assert_eq!(views.filtered_out, 2);
        assert_eq!(views.wide.stations, vec!["Kenmore", "Roxbury"]);
        assert!(views.average.points.iter().all(|(_, v)| *v != Some(400.0)));
    }

    #[test]
    fn test_output_sorted_across_unordered_hours() {
        let rows = vec![
            row("250250002", "Kenmore", "03/05/2024", "09:00", 3.0),
            row("250250002", "Kenmore", "03/05/2024", "07:00", 1.0),
            row("250250002", "Kenmore", "03/05/2024", "08:00", 2.0),
        ];

        let views = process(rows, &StationSet::default()).unwrap();
        let values: Vec<_> = views.average.points.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert!(views.wide.timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_malformed_timestamp_row_excluded() {
        let rows = vec![
            row("250250002", "Kenmore", "03/05/2024", "07:00", 2.0),
            row("250250042", "Roxbury", "03/05/2024", "07:00", 4.0),
            row("250250044", "Chelsea", "03/05/2024", "7h", 1000.0),
        ];

        let views = process(rows, &StationSet::default()).unwrap();
        assert_eq!(views.rejected.len(), 1);
        assert_eq!(views.rejected[0].row.site_name, "Chelsea");
        assert_eq!(views.wide.stations, vec!["Kenmore", "Roxbury"]);
        assert_eq!(views.average.points[0].1, Some(3.0));
    }

    #[test]
    fn test_duplicate_pair_is_an_error() {
        let rows = vec![
            row("250250002", "Kenmore", "03/05/2024", "07:00", 2.0),
            row("250250002", "Kenmore", "03/05/2024", "07:00", 2.5),
        ];
        let err = process(rows, &StationSet::default()).unwrap_err();
        assert!(matches!(err, ReportError::DuplicateReading { .. }));
    }

    #[test]
    fn test_alternate_station_set() {
        let rows = vec![
            row("250250002", "Kenmore", "03/05/2024", "07:00", 2.0),
            row("060370016", "Glendora", "03/05/2024", "07:00", 9.0),
        ];
        let views = process(rows, &StationSet::new(["060370016"])).unwrap();
        assert_eq!(views.wide.stations, vec!["Glendora"]);
    }
}
