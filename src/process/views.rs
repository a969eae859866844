use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::utility::mean_present;
use super::validate::Reading;
use crate::error::ReportError;

/// Mean PM2.5 across all stations of interest, one point per timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AverageView {
    /// Ascending by timestamp. `None` when no station reported a value.
    pub points: Vec<(DateTime<Utc>, Option<f64>)>,
}

impl AverageView {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, timestamp: DateTime<Utc>) -> Option<f64> {
        self.points
            .binary_search_by_key(&timestamp, |(t, _)| *t)
            .ok()
            .and_then(|i| self.points[i].1)
    }
}

/// PM2.5 per station: one row per timestamp, one column per station name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideView {
    /// Row index, ascending.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Column names, sorted.
    pub stations: Vec<String>,
    /// `values[row][column]`; `None` where the station has no reading.
    pub values: Vec<Vec<Option<f64>>>,
}

impl WideView {
    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn column_count(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn get(&self, timestamp: DateTime<Utc>, station: &str) -> Option<f64> {
        let row = self.timestamps.binary_search(&timestamp).ok()?;
        let col = self.stations.iter().position(|s| s == station)?;
        self.values[row][col]
    }

    /// The series for one station, including gaps.
    pub fn column(&self, station: &str) -> Option<Vec<(DateTime<Utc>, Option<f64>)>> {
        let col = self.stations.iter().position(|s| s == station)?;
        Some(
            self.timestamps
                .iter()
                .zip(&self.values)
                .map(|(t, row)| (*t, row[col]))
                .collect(),
        )
    }
}

/// Groups readings by timestamp and averages each group.
pub fn average_view(readings: &[Reading]) -> AverageView {
    let mut groups: BTreeMap<DateTime<Utc>, Vec<Option<f64>>> = BTreeMap::new();
    for r in readings {
        groups.entry(r.timestamp).or_default().push(r.pm25);
    }

    AverageView {
        points: groups
            .into_iter()
            .map(|(t, values)| (t, mean_present(values)))
            .collect(),
    }
}

/// Pivots readings into a timestamp x station table.
///
/// # Errors
///
/// Returns [`ReportError::DuplicateReading`] if two readings share a
/// (timestamp, station name) pair.
pub fn wide_view(readings: &[Reading]) -> Result<WideView, ReportError> {
    let mut cells: BTreeMap<(DateTime<Utc>, &str), Option<f64>> = BTreeMap::new();
    let mut timestamps = BTreeSet::new();
    let mut stations = BTreeSet::new();

    for r in readings {
        if cells.insert((r.timestamp, r.site_name.as_str()), r.pm25).is_some() {
            return Err(ReportError::DuplicateReading {
                timestamp: r.timestamp,
                station: r.site_name.clone(),
            });
        }
        timestamps.insert(r.timestamp);
        stations.insert(r.site_name.as_str());
    }

    let values: Vec<Vec<Option<f64>>> = timestamps
        .iter()
        .map(|t| {
            stations
                .iter()
                .map(|s| cells.get(&(*t, *s)).copied().flatten())
                .collect()
        })
        .collect();

    Ok(WideView {
        timestamps: timestamps.into_iter().collect(),
        stations: stations.into_iter().map(str::to_string).collect(),
        values,
    })
}
