use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, info, warn};

use super::archive::HourlySource;
use crate::error::ReportError;
use crate::parser::ObservationRow;

/// Upper bound on simultaneous archive requests.
pub const MAX_CONCURRENCY: usize = 24;

/// What to do when an hour's table cannot be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingHourPolicy {
    /// Abort the whole run.
    #[default]
    Fail,
    /// Log a warning and continue without that hour.
    Skip,
}

/// Rows of every retrieved hour, concatenated in window order.
#[derive(Debug, Default)]
pub struct FetchedWindow {
    pub rows: Vec<ObservationRow>,
    pub fetched_hours: Vec<DateTime<Utc>>,
    pub missing_hours: Vec<DateTime<Utc>>,
}

/// Fetches one table per hour with at most `concurrency` requests in flight.
///
/// Results are collected in the order of `hours`, independent of which
/// request finishes first. Parse errors always fail the window; retrieval
/// errors follow `policy`.
#[tracing::instrument(skip(source, hours), fields(hours = hours.len()))]
pub async fn fetch_window(
    source: Arc<dyn HourlySource>,
    hours: &[DateTime<Utc>],
    concurrency: usize,
    policy: MissingHourPolicy,
) -> Result<FetchedWindow, ReportError> {
    let semaphore = Arc::new(Semaphore::new(concurrency.clamp(1, MAX_CONCURRENCY)));
    let mut tasks = Vec::with_capacity(hours.len());

    for &hour in hours {
        let sem = semaphore.clone();
        let source = source.clone();
        let span = tracing::info_span!("fetch_hour", hour = %hour);

        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire_owned().await.expect("fetch semaphore is never closed");
                source.fetch_hour(hour).await
            }
            .instrument(span),
        );
        tasks.push((hour, task));
    }

    let mut window = FetchedWindow::default();
    let mut pending = tasks.into_iter();

    while let Some((hour, task)) = pending.next() {
        let result = task
            .await
            .map_err(|source| ReportError::Task { hour, source })?;

        match result {
            Ok(rows) => {
                window.rows.extend(rows);
                window.fetched_hours.push(hour);
            }
            Err(e) if e.is_retrieval() && policy == MissingHourPolicy::Skip => {
                warn!(hour = %hour, error = %e, "Hourly table unavailable, skipping hour");
                window.missing_hours.push(hour);
            }
            Err(e) => {
                for (_, rest) in pending {
                    rest.abort();
                }
                return Err(e);
            }
        }
    }

    info!(
        fetched = window.fetched_hours.len(),
        missing = window.missing_hours.len(),
        rows = window.rows.len(),
        "Fetch window complete"
    );
    Ok(window)
}
