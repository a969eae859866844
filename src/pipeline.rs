//! End-to-end report run: window -> fetch -> process -> render.

use chrono::{DateTime, TimeDelta, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::error::ReportError;
use crate::fetch::{HourlySource, MissingHourPolicy, fetch_window};
use crate::output::{DEFAULT_OUTPUT_DIR, write_views_csv};
use crate::process::{ProcessedViews, process};
use crate::render::{RenderedReport, render_report};
use crate::stations::StationSet;
use crate::window::past_hours;

pub const DEFAULT_HOURS: usize = 24;
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub hours: usize,
    pub stations: StationSet,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub missing_hours: MissingHourPolicy,
    pub export_csv: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            hours: DEFAULT_HOURS,
            stations: StationSet::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            concurrency: DEFAULT_CONCURRENCY,
            missing_hours: MissingHourPolicy::Fail,
            export_csv: false,
        }
    }
}

#[derive(Debug)]
pub struct ReportOutcome {
    pub views: ProcessedViews,
    pub rendered: RenderedReport,
    pub missing_hours: Vec<DateTime<Utc>>,
}

/// The hours a run at `now` covers: the window ends two hours before `now`'s hour,
/// since the most recent hour is usually not published yet.
pub fn report_window(now: DateTime<Utc>, hours: usize) -> Vec<DateTime<Utc>> {
    past_hours(now - TimeDelta::hours(1), hours)
}

/// Fetches and processes the window for `now` without writing anything.
pub async fn build_views(
    config: &ReportConfig,
    source: Arc<dyn HourlySource>,
    now: DateTime<Utc>,
) -> Result<(ProcessedViews, Vec<DateTime<Utc>>), ReportError> {
    let window = report_window(now, config.hours);
    if let (Some(first), Some(last)) = (window.first(), window.last()) {
        info!(first = %first, last = %last, hours = window.len(), "Report window");
    }

    let fetched = fetch_window(source, &window, config.concurrency, config.missing_hours).await?;
    let views = process(fetched.rows, &config.stations)?;

    Ok((views, fetched.missing_hours))
}

/// Runs the full report for `now` and writes the artifacts to `config.output_dir`.
#[tracing::instrument(skip(config, source), fields(now = %now, output_dir = %config.output_dir.display()))]
pub async fn run(
    config: &ReportConfig,
    source: Arc<dyn HourlySource>,
    now: DateTime<Utc>,
) -> Result<ReportOutcome, ReportError> {
    let (views, missing_hours) = build_views(config, source, now).await?;

    let rendered = render_report(&config.output_dir, &views.average, &views.wide, now)?;

    if config.export_csv {
        write_views_csv(&config.output_dir, &views.wide, &views.average)?;
    }

    Ok(ReportOutcome {
        views,
        rendered,
        missing_hours,
    })
}
