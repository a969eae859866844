//! Error type shared by every stage of the report pipeline.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ReportError {
    /// The hourly table could not be retrieved (unreachable, not yet published, ...).
    #[error("failed to retrieve observations for hour {hour} from {url}: {source}")]
    Retrieval {
        hour: DateTime<Utc>,
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("malformed observation table for hour {hour}: {source}")]
    Parse {
        hour: DateTime<Utc>,
        #[source]
        source: crate::parser::TableError,
    },

    /// Two readings for the same station at the same timestamp.
    #[error("duplicate reading for station '{station}' at {timestamp}")]
    DuplicateReading {
        timestamp: DateTime<Utc>,
        station: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render {}: {message}", path.display())]
    Render { path: PathBuf, message: String },

    #[error("fetch task for hour {hour} did not complete: {source}")]
    Task {
        hour: DateTime<Utc>,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for failures caused by an hour that could not be retrieved.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, ReportError::Retrieval { .. })
    }
}
