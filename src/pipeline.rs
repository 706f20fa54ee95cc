use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::config::{Config, ConfigError};
use crate::downloader::{StationDownloader, StationOutcome};
use crate::fetcher::YearFetcher;
use crate::models::{MonthlyRecord, StationRef};
use crate::station_list::{load_station_list, StationListError};
use crate::task_file::{write_task_file, TaskFileError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Station list error: {0}")]
    StationList(#[from] StationListError),

    #[error("Failed to write task file: {0}")]
    TaskFile(#[from] TaskFileError),
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub with_data: usize,
    pub no_data: usize,
    /// Stations whose download failed, with the error message
    pub failed: Vec<(StationRef, String)>,
}

impl RunSummary {
    pub fn stations(&self) -> usize {
        self.with_data + self.no_data + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Download every station in the station list and write one task file each.
///
/// Stations are processed one after another. A station whose download fails
/// is reported and skipped, and its existing task file is left untouched.
/// Station list and task file errors abort the run.
#[instrument(skip(config, downloader), fields(start_year = config.start_year, end_year = config.end_year))]
pub async fn run<F: YearFetcher>(
    config: &Config,
    downloader: &StationDownloader<F>,
) -> Result<RunSummary, PipelineError> {
    config.validate()?;

    let stations = load_station_list(&config.station_list_path)?;
    info!(
        "Updating {} stations, {} requests each",
        stations.len(),
        config.year_count()
    );

    let mut summary = RunSummary::default();

    for (idx, station) in stations.iter().enumerate() {
        debug!("Processing station {} ({}/{})", station, idx + 1, stations.len());

        let outcome = downloader
            .download_outcome(station.source_id, config.start_year, config.end_year)
            .await;
        let path = config.output_path_for(station);

        match outcome {
            StationOutcome::Success(records) => {
                write_task_file(&path, station, &records)?;
                let last = records
                    .last()
                    .map(MonthlyRecord::month_label)
                    .unwrap_or_default();
                println!("Got data for station {station}, last data: {last}");
                summary.with_data += 1;
            }
            StationOutcome::NoData => {
                write_task_file(&path, station, &[])?;
                println!("No data for station {station}");
                summary.no_data += 1;
            }
            StationOutcome::Failed(e) => {
                error!("Station {} failed: {}", station, e);
                println!("Failed to download station {station}: {e}");
                summary.failed.push((*station, e.to_string()));
            }
        }
    }

    info!(
        "Run complete: {} with data, {} without data, {} failed",
        summary.with_data,
        summary.no_data,
        summary.failed.len()
    );
    println!("Finished");

    Ok(summary)
}
