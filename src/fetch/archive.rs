use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};

use super::client::HttpClient;
use super::fetch_bytes;
use crate::error::ReportError;
use crate::parser::{ObservationRow, parse_hourly_table};

pub const ARCHIVE_BASE_URL: &str = "https://s3-us-west-1.amazonaws.com//files.airnowtech.org/airnow";

/// Builds the archive address of the observation table for `hour`:
/// `<base>/<YYYY>/<YYYYMMDD>/HourlyAQObs_<YYYYMMDDHH>.dat`.
pub fn hourly_url(hour: DateTime<Utc>) -> String {
    url_with_base(ARCHIVE_BASE_URL, hour)
}

fn url_with_base(base: &str, hour: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}/HourlyAQObs_{}.dat",
        base,
        hour.format("%Y"),
        hour.format("%Y%m%d"),
        hour.format("%Y%m%d%H"),
    )
}

/// Anything that can produce the observation table for one hour.
#[async_trait]
pub trait HourlySource: Send + Sync {
    async fn fetch_hour(&self, hour: DateTime<Utc>) -> Result<Vec<ObservationRow>, ReportError>;
}

/// [`HourlySource`] backed by the public AirNow S3 archive.
///
/// A failed retrieval is retried `retries` times, `retry_delay` apart.
/// Parse failures are never retried.
pub struct ArchiveSource<C> {
    client: C,
    base_url: String,
    retries: u32,
    retry_delay: Duration,
}

impl<C: HttpClient> ArchiveSource<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            base_url: ARCHIVE_BASE_URL.to_string(),
            retries: 0,
            retry_delay: Duration::from_secs(30),
        }
    }

    pub fn with_retries(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn url_for(&self, hour: DateTime<Utc>) -> String {
        url_with_base(&self.base_url, hour)
    }
}

#[async_trait]
impl<C: HttpClient> HourlySource for ArchiveSource<C> {
    #[tracing::instrument(skip(self), fields(hour = %hour))]
    async fn fetch_hour(&self, hour: DateTime<Utc>) -> Result<Vec<ObservationRow>, ReportError> {
        let url = self.url_for(hour);
        let mut attempt = 0;

        let bytes = loop {
            match fetch_bytes(&self.client, &url).await {
                Ok(bytes) => break bytes,
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        url = %url,
                        error = %e,
                        attempt,
                        retries = self.retries,
                        "Hourly table fetch failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(source) => return Err(ReportError::Retrieval { hour, url, source }),
            }
        };

        debug!(bytes = bytes.len(), "Hourly table received, parsing");
        let rows = parse_hourly_table(&bytes).map_err(|source| ReportError::Parse { hour, source })?;
        debug!(rows = rows.len(), "Hourly table parsed");

        Ok(rows)
    }
}
