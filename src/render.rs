//! Two-panel PM2.5 report chart: cross-station average on top, one line per
//! station below, both panels on the same axes.
//!
//! The chart is written as a bitmap (`report.png`) and as a vector page
//! (`report.pdf`, drawn as SVG and converted).

use chrono::{DateTime, TimeDelta, Utc};
use plotters::coord::Shift;
use plotters::coord::types::RangedDateTime;
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ReportError;
use crate::output::{PDF_FILE_NAME, PNG_FILE_NAME, ensure_dir};
use crate::process::{AverageView, WideView};
use crate::window::floor_to_hour;

/// 8.5 x 11 in at 100 dpi.
pub const PAGE_SIZE: (u32, u32) = (850, 1100);
pub const X_LABEL: &str = "Measurement time (UTC)";
pub const Y_LABEL: &str = "Concentration of PM₂.₅ (µg/m³)";

type Series = Vec<(DateTime<Utc>, Option<f64>)>;

/// Paths of the written artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub png: PathBuf,
    pub pdf: PathBuf,
}

/// Axis ranges shared by both panels.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartBounds {
    pub x: Range<DateTime<Utc>>,
    pub y: Range<f64>,
}

impl ChartBounds {
    /// Covers every point of both views. Empty views fall back to the day
    /// before `as_of` and a unit concentration range.
    pub fn from_views(average: &AverageView, wide: &WideView, as_of: DateTime<Utc>) -> Self {
        let times = average
            .points
            .iter()
            .map(|(t, _)| *t)
            .chain(wide.timestamps.iter().copied());
        let (min_t, max_t) = match times.fold(None, |acc: Option<(DateTime<Utc>, DateTime<Utc>)>, t| {
            Some(acc.map_or((t, t), |(lo, hi)| (lo.min(t), hi.max(t))))
        }) {
            Some((lo, hi)) if lo < hi => (lo, hi),
            Some((t, _)) => (t - TimeDelta::hours(1), t + TimeDelta::hours(1)),
            None => {
                let end = floor_to_hour(as_of);
                (end - TimeDelta::days(1), end)
            }
        };

        let values = average
            .points
            .iter()
            .filter_map(|(_, v)| *v)
            .chain(wide.values.iter().flatten().filter_map(|v| *v));
        let (min_v, max_v) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let y = if min_v > max_v {
            0.0..1.0
        } else {
            let pad = if (max_v - min_v).abs() > 1e-6 {
                (max_v - min_v) * 0.1
            } else {
                1.0
            };
            (min_v - pad)..(max_v + pad)
        };

        ChartBounds {
            x: min_t..max_t,
            y,
        }
    }
}

/// Splits a series with gaps into runs of consecutive present values.
pub fn segments(series: &[(DateTime<Utc>, Option<f64>)]) -> Vec<Vec<(DateTime<Utc>, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for (t, v) in series {
        match v {
            Some(v) => current.push((*t, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

/// Title date, e.g. `March 05, 2024`.
pub fn format_report_date(as_of: DateTime<Utc>) -> String {
    as_of.format("%B %d, %Y").to_string()
}

/// Draws both panels onto `root` and presents it.
pub fn draw_report<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    average: &AverageView,
    wide: &WideView,
    as_of: DateTime<Utc>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let bounds = ChartBounds::from_views(average, wide, as_of);
    let date = format_report_date(as_of);
    let (_, height) = root.dim_in_pixel();
    let (top, bottom) = root.split_vertically((height / 2) as i32);

    let mut avg_chart = ChartBuilder::on(&top)
        .caption(
            format!("Average PM₂.₅ concentration as of {date}"),
            ("sans-serif", 22),
        )
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(RangedDateTime::from(bounds.x.clone()), bounds.y.clone())?;
    draw_mesh(&mut avg_chart)?;

    for run in segments(&average.points) {
        avg_chart.draw_series(LineSeries::new(run, BLUE.stroke_width(2)).point_size(2))?;
    }

    let mut station_chart = ChartBuilder::on(&bottom)
        .caption(
            format!("PM₂.₅ concentration by station as of {date}"),
            ("sans-serif", 22),
        )
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(RangedDateTime::from(bounds.x), bounds.y)?;
    draw_mesh(&mut station_chart)?;

    if !wide.stations.is_empty() {
        // legend heading, no marker
        station_chart
            .draw_series(LineSeries::new(
                std::iter::empty::<(DateTime<Utc>, f64)>(),
                BLACK,
            ))?
            .label("Site name");
    }

    for (i, station) in wide.stations.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let series: Series = wide.column(station).unwrap_or_default();

        let mut runs = segments(&series);
        if runs.is_empty() {
            runs.push(Vec::new());
        }

        for (j, run) in runs.into_iter().enumerate() {
            let anno = station_chart
                .draw_series(LineSeries::new(run, color.stroke_width(2)).point_size(2))?;
            if j == 0 {
                anno.label(station.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }
        }
    }

    if !wide.stations.is_empty() {
        station_chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_mesh<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedDateTime<DateTime<Utc>>, plotters::coord::types::RangedCoordf64>>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    chart
        .configure_mesh()
        .x_desc(X_LABEL)
        .y_desc(Y_LABEL)
        .x_labels(8)
        .x_label_formatter(&|dt: &DateTime<Utc>| dt.format("%m-%d %H:%M").to_string())
        .light_line_style(BLACK.mix(0.15))
        .draw()
}

fn render_error(path: &Path, e: impl std::fmt::Display) -> ReportError {
    ReportError::Render {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Writes the bitmap version of the report to `path`.
pub fn render_png(
    path: &Path,
    average: &AverageView,
    wide: &WideView,
    as_of: DateTime<Utc>,
) -> Result<(), ReportError> {
    let root = BitMapBackend::new(path, PAGE_SIZE).into_drawing_area();
    draw_report(&root, average, wide, as_of).map_err(|e| render_error(path, e))
}

/// Failure converting the SVG rendering into a PDF page.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("invalid SVG: {0}")]
    Svg(svg2pdf::usvg::Error),
    #[error("PDF conversion failed: {0}")]
    Convert(svg2pdf::ConversionError),
}

/// Renders the report as an SVG document.
pub fn render_svg(
    average: &AverageView,
    wide: &WideView,
    as_of: DateTime<Utc>,
) -> Result<String, DrawingAreaErrorKind<std::io::Error>> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, PAGE_SIZE).into_drawing_area();
        draw_report(&root, average, wide, as_of)?;
    }
    Ok(svg)
}

/// Converts an SVG document into a single-page PDF.
pub fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, PdfError> {
    let mut options = svg2pdf::usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = svg2pdf::usvg::Tree::from_str(svg, &options).map_err(PdfError::Svg)?;
    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(PdfError::Convert)
}

/// Writes the vector version of the report to `path`.
pub fn render_pdf(
    path: &Path,
    average: &AverageView,
    wide: &WideView,
    as_of: DateTime<Utc>,
) -> Result<(), ReportError> {
    let svg = render_svg(average, wide, as_of).map_err(|e| render_error(path, e))?;
    debug!(svg_bytes = svg.len(), "Report drawn as SVG, converting to PDF");

    let pdf = svg_to_pdf(&svg).map_err(|e| render_error(path, e))?;
    std::fs::write(path, pdf).map_err(|e| ReportError::io(path, e))
}

/// Draws the report into `dir` (created if missing) as PNG and PDF.
#[tracing::instrument(skip(average, wide), fields(dir = %dir.display(), as_of = %as_of))]
pub fn render_report(
    dir: &Path,
    average: &AverageView,
    wide: &WideView,
    as_of: DateTime<Utc>,
) -> Result<RenderedReport, ReportError> {
    ensure_dir(dir)?;

    let png = dir.join(PNG_FILE_NAME);
    let pdf = dir.join(PDF_FILE_NAME);

    render_png(&png, average, wide, as_of)?;
    render_pdf(&pdf, average, wide, as_of)?;

    info!(png = %png.display(), pdf = %pdf.display(), "Report written");
    Ok(RenderedReport { png, pdf })
}
