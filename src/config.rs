use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use crate::fetcher::DEFAULT_API_URL;
use crate::models::StationRef;
use crate::task_file::task_file_path;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Application id must not be empty (the service asks callers to identify themselves)")]
    EmptyApplicationId,

    #[error("Invalid API URL '{url}': {message}")]
    InvalidApiUrl { url: String, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub station_list_path: PathBuf,
    pub output_directory: PathBuf,
    pub start_year: i32,
    pub end_year: i32,
    /// Organization name sent as the `application` query parameter
    pub application_id: String,
    pub api_url: String,
}

impl Config {
    pub fn new(
        station_list_path: PathBuf,
        output_directory: PathBuf,
        start_year: i32,
        end_year: i32,
        application_id: String,
    ) -> Self {
        Self {
            station_list_path,
            output_directory,
            start_year,
            end_year,
            application_id,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_id.trim().is_empty() {
            return Err(ConfigError::EmptyApplicationId);
        }

        reqwest::Url::parse(&self.api_url).map_err(|e| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            message: e.to_string(),
        })?;

        if self.start_year > self.end_year {
            warn!(
                "start year {} is after end year {}, no data will be requested",
                self.start_year, self.end_year
            );
        }

        Ok(())
    }

    /// Number of yearly requests made per station
    pub fn year_count(&self) -> usize {
        if self.start_year > self.end_year {
            0
        } else {
            (i64::from(self.end_year) - i64::from(self.start_year) + 1) as usize
        }
    }

    pub fn output_path_for(&self, station: &StationRef) -> PathBuf {
        task_file_path(&self.output_directory, station)
    }
}
