//! Retrieval of hourly observation tables from the AirNow archive.

mod archive;
mod basic;
mod batch;
mod client;

pub use archive::{ARCHIVE_BASE_URL, ArchiveSource, HourlySource, hourly_url};
pub use basic::BasicClient;
pub use batch::{FetchedWindow, MAX_CONCURRENCY, MissingHourPolicy, fetch_window};
pub use client::HttpClient;

use crate::error::BoxError;

/// Performs a single GET and returns the body, failing on any non-2xx status.
///
/// The archive answers 403/404 for hours that have not been published yet.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>, BoxError> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}
