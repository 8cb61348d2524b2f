//! demos/plot_rainfall.rs
//!
//! Builds a day-of-year rainfall climatology from a small synthetic dataset
//! with two rainy seasons and renders the chart to HTML with `plotlars`.
//!
//! To run this example:
//! cargo run --example plot_rainfall --features plotting

use chrono::{Datelike, NaiveDate};
use rainfall_climatology::{ChartFormat, Climatology, DataSource, PipelineConfig};
use std::error::Error;
use std::f64::consts::PI;
use std::fmt::Write as _;
use std::path::Path;

const BOUNDARY: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "properties": {"ADM0_NAME": "Demo"},
        "geometry": {"type": "Polygon", "coordinates": [[[35.0, -1.0], [38.0, -1.0], [38.0, 2.0], [35.0, 2.0], [35.0, -1.0]]]}
    }]
}"#;

/// Long rains peak in mid April, short rains in early November (metres per day).
fn daily_rainfall(day: NaiveDate) -> f64 {
    let t = day.ordinal() as f64 / 365.0;
    let long_rains = (-((t - 0.29) / 0.06).powi(2)).exp();
    let short_rains = 0.6 * (-((t - 0.84) / 0.05).powi(2)).exp();
    0.001 + 0.008 * (long_rains + short_rains) + 0.0005 * (2.0 * PI * 7.0 * t).sin().abs()
}

fn write_inputs(dir: &Path) -> Result<(), Box<dyn Error>> {
    std::fs::write(dir.join("boundary.geojson"), BOUNDARY)?;

    let mut csv = String::from("date,lat,lon,total_precipitation\n");
    let start = NaiveDate::from_ymd_opt(2009, 1, 1).ok_or("bad date")?;
    for day in start.iter_days().take_while(|d| d.year() <= 2019) {
        for lat in [-0.5, 0.5, 1.5] {
            for lon in [35.5, 36.5, 37.5] {
                writeln!(csv, "{},{},{},{}", day, lat, lon, daily_rainfall(day))?;
            }
        }
    }
    std::fs::write(dir.join("images.csv"), csv)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let dir = std::env::temp_dir().join("rainfall_climatology_demo");
    std::fs::create_dir_all(&dir)?;
    println!("Writing synthetic inputs to {}", dir.display());
    write_inputs(&dir)?;

    let config = PipelineConfig::builder()
        .country_name("Demo")
        .country_prefix("DEMO")
        .images(DataSource::from(dir.join("images.csv")))
        .boundaries(DataSource::from(dir.join("boundary.geojson")))
        .destination(dir.join("output"))
        .include_day_of_year(true)
        .chart(ChartFormat::Html)
        .build();

    let climatology = Climatology::with_cache_folder(dir.join("cache")).await?;
    let output = climatology.run(&config).await?;

    let wettest = output
        .series
        .iter()
        .filter_map(|s| s.rainfall_cm.map(|v| (s.doy, v)))
        .fold((0, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
    println!("Wettest day of year: {} ({:.2} cm)", wettest.0, wettest.1);
    println!("Chart written to {}", output.chart_path.display());
    println!("CSV written to {}", output.export?.display());

    Ok(())
}
