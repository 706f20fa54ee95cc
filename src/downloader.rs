use std::num::ParseFloatError;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::fetch_error::FetchError;
use crate::fetcher::{RawObservation, YearFetcher};
use crate::models::MonthlyRecord;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Fetching year {year} failed: {source}")]
    Fetch {
        year: i32,
        #[source]
        source: FetchError,
    },

    #[error("Invalid height '{value}' for {year}-{month:02}: {source}")]
    InvalidHeight {
        year: i32,
        month: u32,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("Invalid month {month} in year {year}")]
    InvalidMonth { year: i32, month: u32 },
}

/// Result of downloading one station over the configured year range
#[derive(Debug)]
pub enum StationOutcome {
    Success(Vec<MonthlyRecord>),
    NoData,
    Failed(DownloadError),
}

impl From<Result<Vec<MonthlyRecord>, DownloadError>> for StationOutcome {
    fn from(result: Result<Vec<MonthlyRecord>, DownloadError>) -> Self {
        match result {
            Ok(records) if records.is_empty() => StationOutcome::NoData,
            Ok(records) => StationOutcome::Success(records),
            Err(e) => StationOutcome::Failed(e),
        }
    }
}

/// Downloads a station year by year and keeps the months that carry a value
pub struct StationDownloader<F> {
    fetcher: F,
}

impl<F: YearFetcher> StationDownloader<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Monthly records for `start_year..=end_year`, in request order.
    ///
    /// An inverted range yields no records and issues no requests. Records
    /// are neither re-sorted nor deduplicated.
    #[instrument(skip(self))]
    pub async fn download_station(
        &self,
        source_id: u32,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<MonthlyRecord>, DownloadError> {
        let mut records = Vec::new();

        if start_year > end_year {
            warn!("Empty year range {}..={}, nothing to download", start_year, end_year);
            return Ok(records);
        }

        for year in start_year..=end_year {
            debug!("Downloading {}", year);
            let observations = self
                .fetcher
                .fetch_year(source_id, year)
                .await
                .map_err(|source| DownloadError::Fetch { year, source })?;

            let received = observations.len();
            let mut skipped = 0;
            for raw in observations {
                match promote(raw)? {
                    Some(record) => records.push(record),
                    None => skipped += 1,
                }
            }

            debug!(
                "Year {}: {} observations, {} without a height",
                year, received, skipped
            );
        }

        info!(
            "Downloaded {} monthly records for station {}",
            records.len(),
            source_id
        );
        Ok(records)
    }

    pub async fn download_outcome(
        &self,
        source_id: u32,
        start_year: i32,
        end_year: i32,
    ) -> StationOutcome {
        self.download_station(source_id, start_year, end_year)
            .await
            .into()
    }
}

/// Turn a raw observation into a record; `Ok(None)` when it has no height
pub fn promote(raw: RawObservation) -> Result<Option<MonthlyRecord>, DownloadError> {
    let height_text = raw.height_text.trim();
    if height_text.is_empty() {
        return Ok(None);
    }

    let height_m = height_text
        .parse::<f64>()
        .map_err(|source| DownloadError::InvalidHeight {
            year: raw.year,
            month: raw.month,
            value: raw.height_text.clone(),
            source,
        })?;

    MonthlyRecord::new(raw.year, raw.month, height_m, raw.inferred)
        .map(Some)
        .ok_or(DownloadError::InvalidMonth {
            year: raw.year,
            month: raw.month,
        })
}
