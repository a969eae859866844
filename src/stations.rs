use std::collections::BTreeSet;
use std::path::Path;

use crate::error::ReportError;

/// Cambridge, MA monitoring stations.
pub const CAMBRIDGE_STATIONS: &[&str] = &[
    "250250002",
    "840250250045",
    "840250251004",
    "250250042",
    "250250044",
];

/// The set of station ids (AQSID) a report is restricted to.
///
/// Built once at startup and passed down; never mutated afterwards.
/// Can be loaded from a plain JSON array on disk:
/// ```json
/// ["250250002", "840250250045"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationSet {
    ids: BTreeSet<String>,
}

impl StationSet {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Loads a station set from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        let ids: Vec<String> = serde_json::from_str(&content).map_err(|e| ReportError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if ids.is_empty() {
            return Err(ReportError::Config {
                path: path.to_path_buf(),
                message: "station list is empty".to_string(),
            });
        }

        Ok(Self::new(ids))
    }

    pub fn contains(&self, aqsid: &str) -> bool {
        self.ids.contains(aqsid)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl Default for StationSet {
    fn default() -> Self {
        Self::new(CAMBRIDGE_STATIONS.iter().copied())
    }
}
