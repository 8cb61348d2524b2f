//! Entry point: resolves the region, loads the image collection, builds the
//! day-of-year climatology and writes the chart and CSV export.

use crate::boundaries::boundary_set::{BoundarySet, DEFAULT_NAME_FIELD};
use crate::climatology::composite_collection::{centimeter_band, CompositeCollection};
use crate::climatology::day_of_year::LeapRule;
use crate::climatology::region_mask::{RegionMask, DEFAULT_SCALE_M};
use crate::collection::error::CollectionError;
use crate::collection::image_collection::ImageCollection;
use crate::collection::loader::ImageLoader;
use crate::error::ClimatologyError;
use crate::export::chart::{ChartFormat, ChartSpec};
use crate::export::csv_export::{CsvExport, DEFAULT_EXPORT_FOLDER};
use crate::export::error::ExportError;
use crate::export::job::DEFAULT_POLL_INTERVAL;
use crate::types::data_source::DataSource;
use crate::types::date_range::DateRange;
use crate::types::region::Region;
use crate::types::sample::RegionalSeries;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::Builder;
use log::{debug, info, warn};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Band holding daily total precipitation in metres.
pub const DEFAULT_BAND: &str = "total_precipitation";

/// Everything a run needs.
///
/// Only the country and the two data sources are required; the rest default
/// to a 2009 through 2019 rainfall climatology sampled at 10 km.
///
/// ```
/// use rainfall_climatology::{DataSource, LeapRule, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .country_name("Kenya")
///     .country_prefix("KEN")
///     .images(DataSource::from(std::path::Path::new("era5_daily.parquet")))
///     .boundaries(DataSource::from(std::path::Path::new("gaul_level0.geojson")))
///     .build();
/// assert_eq!(config.leap_rule, LeapRule::Mod4);
/// assert_eq!(config.band, "total_precipitation");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct PipelineConfig {
    /// Matched exactly against the boundary name field.
    #[builder(into)]
    pub country_name: String,
    /// Used for the export file name, e.g. `KEN` gives `KEN_rainfall.csv`.
    #[builder(into)]
    pub country_prefix: String,
    pub images: DataSource,
    pub boundaries: DataSource,
    #[builder(default)]
    pub date_range: DateRange,
    #[builder(default)]
    pub leap_rule: LeapRule,
    #[builder(into, default = DEFAULT_BAND.to_string())]
    pub band: String,
    /// Ground sampling distance of the regional mean, in metres.
    #[builder(default = DEFAULT_SCALE_M)]
    pub scale_m: f64,
    #[builder(into, default = DEFAULT_NAME_FIELD.to_string())]
    pub name_field: String,
    /// Folder receiving the CSV export and the chart.
    #[builder(into, default = PathBuf::from(DEFAULT_EXPORT_FOLDER))]
    pub destination: PathBuf,
    #[builder(default)]
    pub include_day_of_year: bool,
    #[builder(default)]
    pub chart: ChartFormat,
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    pub poll_interval: Duration,
}

impl PipelineConfig {
    /// Rejects configurations that cannot produce a result, before any data
    /// is read.
    pub fn validate(&self) -> Result<(), ClimatologyError> {
        if self.country_name.trim().is_empty() {
            return Err(ClimatologyError::InvalidConfig(
                "country name must not be empty".to_string(),
            ));
        }
        if self.country_prefix.trim().is_empty()
            || self
                .country_prefix
                .contains(|c: char| std::path::is_separator(c) || c.is_control())
        {
            return Err(ClimatologyError::InvalidConfig(format!(
                "country prefix '{}' cannot be used in a file name",
                self.country_prefix
            )));
        }
        if self.band.is_empty() {
            return Err(ClimatologyError::InvalidConfig(
                "band must not be empty".to_string(),
            ));
        }
        if !self.scale_m.is_finite() || self.scale_m <= 0.0 {
            return Err(ClimatologyError::InvalidConfig(format!(
                "scale must be a positive number of metres, got {}",
                self.scale_m
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ClimatologyError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn export(&self) -> CsvExport {
        CsvExport::new(&self.country_prefix, &self.destination)
            .with_day_of_year(self.include_day_of_year)
    }
}

/// Filters, tags, aggregates, converts and reduces `images` over `region`.
///
/// Nothing is evaluated until the pixel grid is read for the mask and the
/// final reduction runs; both are wrapped as [`ClimatologyError::Evaluation`]
/// when the engine fails.
pub fn compute_series(
    images: &ImageCollection,
    region: &Region,
    config: &PipelineConfig,
) -> Result<RegionalSeries, ClimatologyError> {
    images.require_band(&config.band)?;

    let disagreeing = config.leap_rule.disagreements(config.date_range.years());
    if !disagreeing.is_empty() {
        warn!(
            "Leap rule '{}' differs from the Gregorian calendar in {:?}; day-of-year alignment will be off by one in those years",
            config.leap_rule, disagreeing
        );
    }

    let filtered = images
        .filter_date(config.date_range)
        .drop_leap_days();
    let tagged = filtered.tag_day_of_year(config.leap_rule);
    let composites = CompositeCollection::from_tagged(&tagged).to_centimeters(&config.band)?;
    debug!(
        "Composite bands after conversion: {:?}",
        composites.bands()
    );

    let pixels = filtered.pixels()?;
    if pixels.is_empty() {
        return Err(CollectionError::EmptyAfterFilter(config.date_range.to_string()).into());
    }
    let mask = RegionMask::new(region, &pixels, config.scale_m)?;

    let series = composites.reduce_region(&mask, &centimeter_band(&config.band))?;
    series.ensure_complete()?;
    info!(
        "Computed {} day-of-year means for '{}'",
        series.len(),
        region.name()
    );
    Ok(series)
}

/// Result of [`Climatology::run`].
#[derive(Debug)]
pub struct PipelineOutput {
    pub region: Region,
    pub series: RegionalSeries,
    pub chart: ChartSpec,
    pub chart_path: PathBuf,
    /// The written CSV, or why the export job failed. A failed export does
    /// not invalidate the series or the chart.
    pub export: Result<PathBuf, ExportError>,
}

/// Runs the rainfall climatology pipeline, caching remote boundary and image
/// datasets on disk.
pub struct Climatology {
    cache_dir: PathBuf,
    client: Client,
}

impl Climatology {
    /// Uses `cache_folder` for downloaded datasets, creating it if needed.
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, ClimatologyError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| ClimatologyError::CacheDirCreation(cache_folder.clone(), e))?;
        Ok(Self {
            cache_dir: cache_folder,
            client: Client::new(),
        })
    }

    /// Uses the platform cache directory.
    pub async fn new() -> Result<Self, ClimatologyError> {
        let cache_folder = get_cache_dir().ok_or(ClimatologyError::CacheDirResolution)?;
        Self::with_cache_folder(cache_folder).await
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub async fn run(&self, config: &PipelineConfig) -> Result<PipelineOutput, ClimatologyError> {
        config.validate()?;

        info!(
            "Resolving '{}' in boundaries from {}",
            config.country_name, config.boundaries
        );
        let boundaries = BoundarySet::load(
            &config.boundaries,
            &config.name_field,
            &self.cache_dir,
            &self.client,
        )
        .await?;
        let region = boundaries.resolve(&config.country_name, &config.country_prefix)?;

        info!("Loading images from {}", config.images);
        let images = ImageLoader::new(&self.cache_dir, self.client.clone())
            .load(&config.images)
            .await?;

        info!(
            "Building {} climatology for {} ({} leap rule)",
            config.band, config.date_range, config.leap_rule
        );
        let task_region = region.clone();
        let task_config = config.clone();
        let series = tokio::task::spawn_blocking(move || {
            compute_series(&images, &task_region, &task_config)
        })
        .await??;

        let job = config.export().submit(&series).await?;

        let chart = ChartSpec::rainfall(&series);
        let chart_path = chart.write(
            &config.destination,
            &format!("{}_rainfall_chart", config.country_prefix),
            config.chart,
        )?;
        info!("Chart written to {:?}", chart_path);

        let export = job.wait(config.poll_interval).await;
        match &export {
            Ok(path) => info!("Export written to {:?}", path),
            Err(e) => warn!("Export did not complete: {}", e),
        }

        Ok(PipelineOutput {
            region,
            series,
            chart,
            chart_path,
            export,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundaries::error::RegionError;
    use crate::types::image::{DailyImage, Grid};
    use chrono::{Datelike, NaiveDate};
    use std::fmt::Write as _;
    use std::sync::Arc;

    const KENYA: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"ADM0_NAME": "Kenya"},
                "geometry": {"type": "Polygon", "coordinates": [[[35.5, -0.5], [37.5, -0.5], [37.5, 1.5], [35.5, 1.5], [35.5, -0.5]]]}
            },
            {
                "type": "Feature",
                "properties": {"ADM0_NAME": "Uganda"},
                "geometry": {"type": "Polygon", "coordinates": [[[30.0, 0.0], [31.0, 0.0], [31.0, 1.0], [30.0, 0.0]]]}
            }
        ]
    }"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Two years on a 2 x 2 one-degree grid inside the Kenya box.
    fn write_images_csv(path: &Path, value: impl Fn(NaiveDate) -> f64) {
        let mut csv = String::from("date,lat,lon,total_precipitation\n");
        for day in date(2012, 1, 1).iter_days().take_while(|d| d.year() <= 2013) {
            for lat in [0.0, 1.0] {
                for lon in [36.0, 37.0] {
                    writeln!(csv, "{},{},{},{}", day, lat, lon, value(day)).unwrap();
                }
            }
        }
        std::fs::write(path, csv).unwrap();
    }

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig::builder()
            .country_name("Kenya")
            .country_prefix("KEN")
            .images(DataSource::from(dir.join("images.csv")))
            .boundaries(DataSource::from(dir.join("level0.geojson")))
            .destination(dir.join("Earth Engine"))
            .poll_interval(Duration::from_millis(5))
            .build()
    }

    fn kenya() -> Region {
        BoundarySet::from_geojson_bytes(KENYA.as_bytes(), DEFAULT_NAME_FIELD)
            .unwrap()
            .resolve("Kenya", "KEN")
            .unwrap()
    }

    #[tokio::test]
    async fn test_constant_rainfall_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("level0.geojson"), KENYA).unwrap();
        write_images_csv(&dir.path().join("images.csv"), |_| 0.005);

        let climatology = Climatology::with_cache_folder(dir.path().join("cache"))
            .await
            .unwrap();
        let output = climatology.run(&config(dir.path())).await.unwrap();

        assert_eq!(output.region.prefix(), "KEN");
        assert_eq!(output.series.len(), 365);
        assert_eq!(output.series.days(), (1..=365).collect::<Vec<u16>>());
        assert!(output
            .series
            .iter()
            .all(|s| (s.rainfall_cm.unwrap() - 0.5).abs() < 1e-9));
        assert_eq!(output.chart.points.len(), 365);
        assert!(output.chart_path.ends_with("KEN_rainfall_chart.json"));

        let csv_path = output.export.unwrap();
        assert_eq!(csv_path, dir.path().join("Earth Engine").join("KEN_rainfall.csv"));
        let text = std::fs::read_to_string(csv_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 366);
        assert_eq!(lines[0], "rainfall");
        assert!(lines[1..]
            .iter()
            .all(|l| (l.parse::<f64>().unwrap() - 0.5).abs() < 1e-9));
    }

    #[tokio::test]
    async fn test_failed_export_still_returns_chart() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("level0.geojson"), KENYA).unwrap();
        write_images_csv(&dir.path().join("images.csv"), |_| 0.005);
        // A non-empty directory where the CSV should land cannot be replaced.
        let blocked = dir.path().join("Earth Engine").join("KEN_rainfall.csv");
        std::fs::create_dir_all(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), "x").unwrap();

        let climatology = Climatology::with_cache_folder(dir.path().join("cache"))
            .await
            .unwrap();
        let output = climatology.run(&config(dir.path())).await.unwrap();

        assert_eq!(output.series.len(), 365);
        assert!(output.chart_path.exists());
        match output.export {
            Err(ExportError::Failed {
                description,
                reason,
            }) => {
                assert_eq!(description, "KEN_rainfall");
                assert!(!reason.is_empty());
            }
            other => panic!("expected a failed export, got {:?}", other),
        }
        assert!(blocked.join("keep").exists());
    }

    #[tokio::test]
    async fn test_unknown_country_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("level0.geojson"), KENYA).unwrap();
        write_images_csv(&dir.path().join("images.csv"), |_| 0.005);

        let climatology = Climatology::with_cache_folder(dir.path().join("cache"))
            .await
            .unwrap();
        let mut config = config(dir.path());
        config.country_name = "Kenia".to_string();
        let result = climatology.run(&config).await;
        assert!(matches!(
            result,
            Err(ClimatologyError::Region(RegionError::NoMatch { .. }))
        ));
        assert!(!dir.path().join("Earth Engine").exists());
    }

    #[test]
    fn test_validate_rejects_bad_configuration() {
        let dir = Path::new("unused");
        let mut empty_name = config(dir);
        empty_name.country_name = "  ".to_string();
        assert!(matches!(
            empty_name.validate(),
            Err(ClimatologyError::InvalidConfig(_))
        ));

        let mut bad_prefix = config(dir);
        bad_prefix.country_prefix = "KEN/1".to_string();
        assert!(bad_prefix.validate().is_err());

        let mut bad_scale = config(dir);
        bad_scale.scale_m = 0.0;
        assert!(bad_scale.validate().is_err());

        assert!(config(dir).validate().is_ok());
    }

    #[test]
    fn test_compute_series_aligns_leap_years() {
        // Day 1 of March has 0.01 m in 2012 and 0.03 m in 2013; everything else is dry.
        let grid = Arc::new(Grid::regular(0.0, 36.0, 1.0, 2, 2));
        let images: Vec<DailyImage> = date(2012, 1, 1)
            .iter_days()
            .take_while(|d| d.year() <= 2013)
            .map(|d| {
                let value = match (d.year(), d.month(), d.day()) {
                    (2012, 3, 1) => 0.01,
                    (2013, 3, 1) => 0.03,
                    _ => 0.0,
                };
                DailyImage::constant(d, grid.clone(), DEFAULT_BAND, value)
            })
            .collect();
        let collection = ImageCollection::from_images(&images).unwrap();

        let series = compute_series(&collection, &kenya(), &config(Path::new("unused"))).unwrap();
        assert!((series.get(60).unwrap().rainfall_cm.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(series.get(59).unwrap().rainfall_cm, Some(0.0));
        assert_eq!(series.get(61).unwrap().rainfall_cm, Some(0.0));
    }

    #[test]
    fn test_compute_series_outside_window_is_empty() {
        let grid = Arc::new(Grid::regular(0.0, 36.0, 1.0, 1, 1));
        let images = vec![DailyImage::constant(
            date(2021, 6, 1),
            grid,
            DEFAULT_BAND,
            0.001,
        )];
        let collection = ImageCollection::from_images(&images).unwrap();
        assert!(matches!(
            compute_series(&collection, &kenya(), &config(Path::new("unused"))),
            Err(ClimatologyError::Collection(CollectionError::EmptyAfterFilter(_)))
        ));
    }

    #[test]
    fn test_compute_series_requires_band() {
        let grid = Arc::new(Grid::regular(0.0, 36.0, 1.0, 1, 1));
        let images = vec![DailyImage::constant(date(2012, 6, 1), grid, "temperature_2m", 290.0)];
        let collection = ImageCollection::from_images(&images).unwrap();
        assert!(matches!(
            compute_series(&collection, &kenya(), &config(Path::new("unused"))),
            Err(ClimatologyError::Collection(CollectionError::MissingBand { .. }))
        ));
    }
}
