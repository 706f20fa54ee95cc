use clap::Parser;

use tide_gauge_updater::downloader::StationDownloader;
use tide_gauge_updater::fetcher::{TideDataFetcher, DEFAULT_API_URL};

#[derive(Parser)]
#[command(name = "check-station")]
#[command(about = "Print monthly mean sea level for one NOAA station without writing files", long_about = None)]
struct Cli {
    /// NOAA station ID (e.g. 8518750)
    source_id: u32,

    /// First calendar year (inclusive)
    #[arg(long)]
    start_year: i32,

    /// Last calendar year (inclusive, defaults to the start year)
    #[arg(long)]
    end_year: Option<i32>,

    /// Organization name sent to the API
    #[arg(long, env = "APPLICATION_ID")]
    application_id: String,

    /// Datagetter endpoint
    #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Print records as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let end_year = cli.end_year.unwrap_or(cli.start_year);

    let downloader = StationDownloader::new(TideDataFetcher::new(cli.api_url, cli.application_id));
    let records = downloader
        .download_station(cli.source_id, cli.start_year, end_year)
        .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "Station {} ({}-{}): {} monthly records",
        cli.source_id,
        cli.start_year,
        end_year,
        records.len()
    );
    for record in &records {
        println!(
            "  {}  {:>8.3} m{}",
            record.month_label(),
            record.height_m(),
            if record.inferred() { "  (inferred)" } else { "" }
        );
    }

    Ok(())
}
