use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use pm25_report::error::ReportError;
use pm25_report::fetch::{HourlySource, MissingHourPolicy};
use pm25_report::parser::{ObservationRow, parse_hourly_table};
use pm25_report::output::{AVERAGE_CSV_FILE_NAME, PDF_FILE_NAME, PNG_FILE_NAME, WIDE_CSV_FILE_NAME};
use pm25_report::pipeline::{ReportConfig, build_views, report_window, run};
use pm25_report::process::process;
use pm25_report::stations::{CAMBRIDGE_STATIONS, StationSet};
use std::collections::HashMap;
use std::sync::Arc;

const SITE_NAMES: [&str; 5] = ["Kenmore Sq", "Von Hillern St", "Harrison Ave", "Roxbury", "Chelsea"];

/// Serves pre-built tables keyed by hour; unknown hours are "not published".
struct InMemorySource {
    tables: HashMap<DateTime<Utc>, Vec<ObservationRow>>,
}

#[async_trait]
impl HourlySource for InMemorySource {
    async fn fetch_hour(&self, hour: DateTime<Utc>) -> Result<Vec<ObservationRow>, ReportError> {
        self.tables
            .get(&hour)
            .cloned()
            .ok_or_else(|| ReportError::Retrieval {
                hour,
                url: format!("memory://{hour}"),
                source: "404 Not Found".into(),
            })
    }
}

fn value_for(station: usize, hour_index: usize) -> f64 {
    (station as f64 + 1.0) * 2.0 + hour_index as f64
}

fn synthetic_table(hour: DateTime<Utc>, hour_index: usize) -> Vec<ObservationRow> {
    let mut rows: Vec<ObservationRow> = CAMBRIDGE_STATIONS
        .iter()
        .zip(SITE_NAMES)
        .enumerate()
        .map(|(i, (id, name))| ObservationRow {
            aqsid: id.to_string(),
            site_name: name.to_string(),
            valid_date: hour.format("%m/%d/%Y").to_string(),
            valid_time: hour.format("%H:%M").to_string(),
            pm25: Some(value_for(i, hour_index)),
        })
        .collect();

    rows.push(ObservationRow {
        aqsid: "060370016".to_string(),
        site_name: "Glendora - Laurel".to_string(),
        valid_date: hour.format("%m/%d/%Y").to_string(),
        valid_time: hour.format("%H:%M").to_string(),
        pm25: Some(500.0),
    });
    rows
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 6, 9, 41, 7).unwrap()
}

fn full_source() -> InMemorySource {
    let tables = report_window(now(), 24)
        .into_iter()
        .enumerate()
        .map(|(i, hour)| (hour, synthetic_table(hour, i)))
        .collect();
    InMemorySource { tables }
}

#[test]
fn test_fixture_table_to_views() {
    let bytes = include_bytes!("fixtures/HourlyAQObs_sample.dat");
    let rows = parse_hourly_table(bytes).expect("Failed to parse fixture");
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[5].site_name, "Chelsea, Von Hillern");
    assert_eq!(rows[6].pm25, None);

    let views = process(rows, &StationSet::default()).unwrap();
    let ts = Utc.with_ymd_and_hms(2024, 3, 5, 7, 0, 0).unwrap();

    assert_eq!(views.filtered_out, 2);
    assert_eq!(views.wide.row_count(), 1);
    assert_eq!(views.wide.column_count(), 5);
    assert_eq!(views.wide.get(ts, "Kenmore Sq"), Some(7.1));
    assert_eq!(views.wide.get(ts, "Von Hillern St"), Some(6.0));
    assert_eq!(views.wide.get(ts, "Harrison Ave"), Some(9.2));
    assert_eq!(views.wide.get(ts, "Roxbury"), Some(5.1));
    assert_eq!(views.wide.get(ts, "Chelsea, Von Hillern"), Some(8.3));

    let avg = views.average.get(ts).unwrap();
    assert!((avg - 7.14).abs() < 1e-9);
}

#[tokio::test]
async fn test_end_to_end_24_hours() {
    let config = ReportConfig {
        concurrency: 8,
        ..ReportConfig::default()
    };

    let (views, missing) = build_views(&config, Arc::new(full_source()), now())
        .await
        .unwrap();

    assert!(missing.is_empty());
    assert_eq!(views.average.len(), 24);
    assert_eq!(views.wide.row_count(), 24);
    assert_eq!(views.wide.column_count(), 5);
    assert!(views.wide.timestamps.windows(2).all(|w| w[0] < w[1]));
    assert!(views.average.points.windows(2).all(|w| w[0].0 < w[1].0));

    let window = report_window(now(), 24);
    assert_eq!(views.wide.timestamps, window);

    for (i, hour) in window.iter().enumerate() {
        // mean of (k + 1) * 2 + i for k in 0..5
        let expected_mean = 6.0 + i as f64;
        let avg = views.average.get(*hour).unwrap();
        assert!((avg - expected_mean).abs() < 1e-9, "hour {hour}: {avg}");

        for (k, name) in SITE_NAMES.iter().enumerate() {
            assert_eq!(views.wide.get(*hour, name), Some(value_for(k, i)));
        }
    }
    assert!(views.wide.column("Glendora - Laurel").is_none());
}

#[tokio::test]
async fn test_unpublished_latest_hour() {
    let mut source = full_source();
    let latest = *report_window(now(), 24).last().unwrap();
    source.tables.remove(&latest);
    let source = Arc::new(source);

    let err = build_views(&ReportConfig::default(), source.clone(), now())
        .await
        .unwrap_err();
    assert!(err.is_retrieval());
    assert!(err.to_string().contains(&latest.to_string()));

    let tolerant = ReportConfig {
        missing_hours: MissingHourPolicy::Skip,
        ..ReportConfig::default()
    };
    let (views, missing) = build_views(&tolerant, source, now()).await.unwrap();
    assert_eq!(missing, vec![latest]);
    assert_eq!(views.wide.row_count(), 23);
    assert_eq!(views.wide.timestamps.last(), Some(&(latest - TimeDelta::hours(1))));
}

#[tokio::test]
async fn test_malformed_time_row_dropped() {
    let mut source = full_source();
    let hour = report_window(now(), 24)[5];
    let table = source.tables.get_mut(&hour).unwrap();
    table[0].valid_time = "25:99".to_string();

    let (views, _) = build_views(&ReportConfig::default(), Arc::new(source), now())
        .await
        .unwrap();

    assert_eq!(views.rejected.len(), 1);
    assert_eq!(views.wide.row_count(), 24);
    assert_eq!(views.wide.get(hour, SITE_NAMES[0]), None);
    assert_eq!(views.wide.get(hour, SITE_NAMES[1]), Some(value_for(1, 5)));

    // remaining four stations: (4 + 6 + 8 + 10) / 4 + 5
    let avg = views.average.get(hour).unwrap();
    assert!((avg - 12.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_overlapping_tables_fail_integrity_check() {
    let mut source = full_source();
    let window = report_window(now(), 24);
    let repeated = source.tables[&window[3]].clone();
    source.tables.insert(window[4], repeated);

    let err = build_views(&ReportConfig::default(), Arc::new(source), now())
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::DuplicateReading { .. }));
}

#[tokio::test]
async fn test_run_writes_all_artifacts() {
    let dir = std::env::temp_dir().join("pm25_report_test_run").join("resources");
    let _ = std::fs::remove_dir_all(dir.parent().unwrap());

    let config = ReportConfig {
        output_dir: dir.clone(),
        export_csv: true,
        ..ReportConfig::default()
    };
    let outcome = run(&config, Arc::new(full_source()), now()).await.unwrap();

    assert!(outcome.missing_hours.is_empty());
    assert_eq!(outcome.rendered.png, dir.join(PNG_FILE_NAME));
    assert_eq!(outcome.rendered.pdf, dir.join(PDF_FILE_NAME));

    for name in [PNG_FILE_NAME, PDF_FILE_NAME, WIDE_CSV_FILE_NAME, AVERAGE_CSV_FILE_NAME] {
        let len = std::fs::metadata(dir.join(name)).unwrap().len();
        assert!(len > 0, "{name} is empty");
    }
    let pdf = std::fs::read(dir.join(PDF_FILE_NAME)).unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let wide = std::fs::read_to_string(dir.join(WIDE_CSV_FILE_NAME)).unwrap();
    assert_eq!(wide.lines().count(), 25);

    std::fs::remove_dir_all(dir.parent().unwrap()).unwrap();
}
