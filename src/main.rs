use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use tide_gauge_updater::config::Config;
use tide_gauge_updater::downloader::StationDownloader;
use tide_gauge_updater::fetcher::{TideDataFetcher, DEFAULT_API_URL};
use tide_gauge_updater::pipeline;

#[derive(Parser)]
#[command(name = "tide-gauge-updater")]
#[command(about = "Download monthly mean sea level from NOAA CO-OPS into per-station task files", long_about = None)]
struct Cli {
    /// CSV file of `<local id>,<NOAA id>` rows
    #[arg(long, env = "STATION_LIST")]
    station_list: PathBuf,

    /// Directory the `<local id>_<NOAA id>.tsk` files are written to
    #[arg(long, env = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// First calendar year to download (inclusive)
    #[arg(long, env = "START_YEAR")]
    start_year: i32,

    /// Last calendar year to download (inclusive)
    #[arg(long, env = "END_YEAR")]
    end_year: i32,

    /// Organization name sent to the API with every request
    #[arg(long, env = "APPLICATION_ID")]
    application_id: String,

    /// Datagetter endpoint
    #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (ignore errors if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::new(
        cli.station_list,
        cli.output_dir,
        cli.start_year,
        cli.end_year,
        cli.application_id,
    )
    .with_api_url(cli.api_url);
    info!("Starting tide gauge update with config: {:?}", config);

    let fetcher = TideDataFetcher::new(config.api_url.clone(), config.application_id.clone());
    let downloader = StationDownloader::new(fetcher);

    let summary = pipeline::run(&config, &downloader).await?;

    if summary.has_failures() {
        return Err(format!(
            "{} of {} stations failed to download",
            summary.failed.len(),
            summary.stations()
        )
        .into());
    }

    Ok(())
}
