use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use rainfall_climatology::{
    ChartFormat, Climatology, DataSource, DateRange, LeapRule, PipelineConfig,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Computes the day-of-year mean rainfall of a country and exports it as CSV
pub struct Cli {
    /// Country name as it appears in the boundary dataset
    #[arg(long)]
    country: String,
    /// Short code used in output file names
    #[arg(long)]
    prefix: String,
    /// Daily precipitation images (parquet or CSV path, or URL)
    #[arg(long)]
    images: DataSource,
    /// Country boundaries (GeoJSON path or URL)
    #[arg(long)]
    boundaries: DataSource,
    /// First day of the analysis window (inclusive)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last day of the analysis window (inclusive)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Leap year rule: mod4 or gregorian
    #[arg(long)]
    leap_rule: Option<LeapRule>,
    /// Precipitation band, in metres
    #[arg(long)]
    band: Option<String>,
    /// Sampling distance of the regional mean, in metres
    #[arg(long)]
    scale: Option<f64>,
    /// Boundary property holding the country name
    #[arg(long)]
    name_field: Option<String>,
    /// Output folder
    #[arg(long)]
    destination: Option<PathBuf>,
    /// Write the day of year next to each rainfall value
    #[arg(long)]
    with_doy: bool,
    /// Chart format: json or html
    #[arg(long)]
    chart: Option<ChartFormat>,
    /// Cache folder for downloaded datasets
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let date_range = match (cli.start, cli.end) {
        (None, None) => None,
        (start, end) => {
            let window = DateRange::default();
            Some(
                DateRange::new(start.unwrap_or(window.start), end.unwrap_or(window.end))
                    .ok_or_else(|| anyhow!("--start must not be after --end"))?,
            )
        }
    };

    let config = PipelineConfig::builder()
        .country_name(cli.country)
        .country_prefix(cli.prefix)
        .images(cli.images)
        .boundaries(cli.boundaries)
        .maybe_date_range(date_range)
        .maybe_leap_rule(cli.leap_rule)
        .maybe_band(cli.band)
        .maybe_scale_m(cli.scale)
        .maybe_name_field(cli.name_field)
        .maybe_destination(cli.destination)
        .include_day_of_year(cli.with_doy)
        .maybe_chart(cli.chart)
        .build();

    let climatology = match cli.cache_dir {
        Some(dir) => Climatology::with_cache_folder(dir).await,
        None => Climatology::new().await,
    }
    .context("Could not set up the cache folder")?;

    let output = climatology.run(&config).await?;
    println!("Chart saved to `{}`", output.chart_path.display());
    let csv = output.export.context("Export failed")?;
    println!("File saved to `{}`", csv.display());

    Ok(())
}
