//! Contains [`ImageCollection`], a lazy wrapper around a collection of daily
//! precipitation rasters, and the temporal stages of the pipeline.
//!
//! Rasters are stored in long format: one row per (date, pixel), one `Float64`
//! column per band. All methods build on the underlying Polars `LazyFrame`;
//! nothing is evaluated until the frame is collected.

use crate::climatology::day_of_year::{day_of_year_expr, LeapRule};
use crate::collection::error::CollectionError;
use crate::types::date_range::DateRange;
use crate::types::image::DailyImage;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const DATE_COLUMN: &str = "date";
pub const LAT_COLUMN: &str = "lat";
pub const LON_COLUMN: &str = "lon";
pub const YEAR_COLUMN: &str = "year";
pub const DOY_COLUMN: &str = "doy";

/// Columns that are never treated as raster bands.
const NON_BAND_COLUMNS: [&str; 7] = [
    DATE_COLUMN,
    LAT_COLUMN,
    LON_COLUMN,
    YEAR_COLUMN,
    DOY_COLUMN,
    "month",
    "day",
];

/// A lazily evaluated collection of daily rasters.
///
/// The frame always carries `date` (Date), `lat` and `lon` (Float64, pixel
/// centre) plus one Float64 column per band. Any `year`, `month`, `day` or
/// `doy` property columns in the input are dropped; they are derived from
/// `date` where needed.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use rainfall_climatology::{DailyImage, DateRange, Grid, ImageCollection};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let grid = Arc::new(Grid::regular(-1.0, 36.0, 0.25, 2, 2));
/// let images: Vec<DailyImage> = [(2012, 2, 28), (2012, 2, 29), (2012, 3, 1)]
///     .into_iter()
///     .map(|(y, m, d)| {
///         let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
///         DailyImage::constant(date, grid.clone(), "total_precipitation", 0.002)
///     })
///     .collect();
///
/// let collection = ImageCollection::from_images(&images)?
///     .filter_date(DateRange::default())
///     .drop_leap_days();
/// assert_eq!(collection.dates()?.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ImageCollection {
    /// The underlying long-format frame.
    pub frame: LazyFrame,
    bands: Vec<String>,
}

impl ImageCollection {
    /// Wraps a frame, validating the required columns and normalising dtypes.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::MissingColumn`] if `date`, `lat` or `lon` is
    /// absent and [`CollectionError::NoBands`] if no other column remains.
    pub fn new(frame: LazyFrame) -> Result<Self, CollectionError> {
        let mut frame = frame;
        let schema = frame.collect_schema().map_err(CollectionError::Schema)?;

        for required in [DATE_COLUMN, LAT_COLUMN, LON_COLUMN] {
            if !schema.contains(required) {
                return Err(CollectionError::MissingColumn(required.to_string()));
            }
        }

        let bands: Vec<String> = schema
            .iter_names()
            .map(|name| name.to_string())
            .filter(|name| !NON_BAND_COLUMNS.contains(&name.as_str()))
            .collect();
        if bands.is_empty() {
            return Err(CollectionError::NoBands);
        }

        let mut columns = vec![
            col(DATE_COLUMN).cast(DataType::Date),
            col(LAT_COLUMN).cast(DataType::Float64),
            col(LON_COLUMN).cast(DataType::Float64),
        ];
        columns.extend(
            bands
                .iter()
                .map(|band| col(band.as_str()).cast(DataType::Float64)),
        );

        Ok(Self {
            frame: frame.select(columns),
            bands,
        })
    }

    /// Builds a collection from in-memory images.
    ///
    /// Bands are the union over all images; a band missing from an image is
    /// stored as null for that image's pixels.
    pub fn from_images(images: &[DailyImage]) -> Result<Self, CollectionError> {
        if images.is_empty() {
            return Err(CollectionError::Empty);
        }

        let band_names: BTreeSet<String> = images
            .iter()
            .flat_map(|image| image.band_names().map(str::to_string))
            .collect();
        let rows: usize = images.iter().map(|image| image.grid().len()).sum();

        let mut dates: Vec<NaiveDate> = Vec::with_capacity(rows);
        let mut lats: Vec<f64> = Vec::with_capacity(rows);
        let mut lons: Vec<f64> = Vec::with_capacity(rows);
        let mut band_values: BTreeMap<&str, Vec<Option<f64>>> = band_names
            .iter()
            .map(|name| (name.as_str(), Vec::with_capacity(rows)))
            .collect();

        for image in images {
            for (idx, (lat, lon)) in image.grid().pixels().enumerate() {
                dates.push(image.date);
                lats.push(lat);
                lons.push(lon);
                for (name, values) in band_values.iter_mut() {
                    values.push(image.band(name).and_then(|band| band[idx]));
                }
            }
        }

        let mut columns = vec![
            Column::new(DATE_COLUMN.into(), dates),
            Column::new(LAT_COLUMN.into(), lats),
            Column::new(LON_COLUMN.into(), lons),
        ];
        for (name, values) in band_values {
            columns.push(Column::new(name.into(), values));
        }

        let df = DataFrame::new(columns).map_err(CollectionError::Frame)?;
        Self::new(df.lazy())
    }

    /// Lazily scans a long-format parquet file.
    pub fn scan_parquet(path: &Path) -> Result<Self, CollectionError> {
        let frame = LazyFrame::scan_parquet(path, Default::default())
            .map_err(|e| CollectionError::Scan(path.to_path_buf(), e))?;
        Self::new(frame)
    }

    /// Lazily scans a long-format CSV file with a header row.
    pub fn scan_csv(path: &Path) -> Result<Self, CollectionError> {
        let frame = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_try_parse_dates(true)
            .finish()
            .map_err(|e| CollectionError::Scan(path.to_path_buf(), e))?;
        Self::new(frame)
    }

    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn has_band(&self, band: &str) -> bool {
        self.bands.iter().any(|b| b == band)
    }

    /// Fails with [`CollectionError::MissingBand`] unless `band` is present.
    pub fn require_band(&self, band: &str) -> Result<(), CollectionError> {
        if self.has_band(band) {
            Ok(())
        } else {
            Err(CollectionError::MissingBand {
                band: band.to_string(),
                available: self.bands.clone(),
            })
        }
    }

    /// Applies an arbitrary predicate, keeping the band list.
    pub fn filter(&self, predicate: Expr) -> ImageCollection {
        ImageCollection {
            frame: self.frame.clone().filter(predicate),
            bands: self.bands.clone(),
        }
    }

    /// Keeps images whose date lies within `range`, both ends inclusive.
    pub fn filter_date(&self, range: DateRange) -> ImageCollection {
        self.filter(
            col(DATE_COLUMN)
                .gt_eq(lit(range.start))
                .and(col(DATE_COLUMN).lt_eq(lit(range.end))),
        )
    }

    /// Removes every February 29 image so years align on a 365-day calendar.
    pub fn drop_leap_days(&self) -> ImageCollection {
        let is_leap_day = col(DATE_COLUMN)
            .dt()
            .month()
            .eq(lit(2))
            .and(col(DATE_COLUMN).dt().day().eq(lit(29)));
        self.filter(is_leap_day.not())
    }

    /// Adds the calendar `year` and the leap-adjusted, 1-based `doy` columns.
    pub fn tag_day_of_year(&self, rule: LeapRule) -> TaggedCollection {
        let frame = self.frame.clone().with_columns([
            col(DATE_COLUMN)
                .dt()
                .year()
                .cast(DataType::Int32)
                .alias(YEAR_COLUMN),
            day_of_year_expr(DATE_COLUMN, rule)
                .cast(DataType::Int32)
                .alias(DOY_COLUMN),
        ]);
        TaggedCollection {
            frame,
            bands: self.bands.clone(),
            rule,
        }
    }

    /// Distinct pixel centres as (lat, lon), sorted. Evaluates the frame.
    pub fn pixels(&self) -> PolarsResult<Vec<(f64, f64)>> {
        let df = self
            .frame
            .clone()
            .select([col(LAT_COLUMN), col(LON_COLUMN)])
            .unique(None, UniqueKeepStrategy::Any)
            .sort([LAT_COLUMN, LON_COLUMN], SortMultipleOptions::default())
            .collect()?;
        let lats = df.column(LAT_COLUMN)?.f64()?;
        let lons = df.column(LON_COLUMN)?.f64()?;
        Ok(lats
            .into_iter()
            .zip(lons)
            .filter_map(|(lat, lon)| Some((lat?, lon?)))
            .collect())
    }

    /// Distinct image dates, ascending. Evaluates the frame.
    pub fn dates(&self) -> PolarsResult<Vec<NaiveDate>> {
        let df = self
            .frame
            .clone()
            .select([col(DATE_COLUMN)])
            .unique(None, UniqueKeepStrategy::Any)
            .sort([DATE_COLUMN], SortMultipleOptions::default())
            .collect()?;
        Ok(df
            .column(DATE_COLUMN)?
            .date()?
            .as_date_iter()
            .flatten()
            .collect())
    }
}

/// An [`ImageCollection`] carrying `year` and `doy` columns, ready for grouping.
#[derive(Clone)]
pub struct TaggedCollection {
    pub frame: LazyFrame,
    bands: Vec<String>,
    rule: LeapRule,
}

impl TaggedCollection {
    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    pub fn leap_rule(&self) -> LeapRule {
        self.rule
    }
}
