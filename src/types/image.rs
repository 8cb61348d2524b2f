//! In-memory daily rasters, used to build collections from code (synthetic
//! inputs, tests, benchmarks) rather than from a file.

use crate::climatology::day_of_year::{adjusted_day_of_year, LeapRule};
use crate::collection::error::CollectionError;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Pixel-centre coordinates of a regular lat/lon raster.
///
/// Pixels are enumerated row-major: latitude is the outer axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    lats: Vec<f64>,
    lons: Vec<f64>,
}

impl Grid {
    pub fn new(lats: Vec<f64>, lons: Vec<f64>) -> Self {
        Self { lats, lons }
    }

    /// A `rows` x `cols` grid starting at (`lat0`, `lon0`) with `step` degrees between pixel centres.
    pub fn regular(lat0: f64, lon0: f64, step: f64, rows: usize, cols: usize) -> Self {
        Self {
            lats: (0..rows).map(|i| lat0 + step * i as f64).collect(),
            lons: (0..cols).map(|j| lon0 + step * j as f64).collect(),
        }
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn len(&self) -> usize {
        self.lats.len() * self.lons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (lat, lon) of every pixel, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.lats
            .iter()
            .flat_map(move |&lat| self.lons.iter().map(move |&lon| (lat, lon)))
    }
}

/// One raster observation for a single calendar date.
///
/// Each band holds one value per pixel of the shared [`Grid`], row-major.
/// `None` marks a masked pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyImage {
    pub date: NaiveDate,
    grid: Arc<Grid>,
    bands: BTreeMap<String, Vec<Option<f64>>>,
}

impl DailyImage {
    pub fn new(date: NaiveDate, grid: Arc<Grid>) -> Self {
        Self {
            date,
            grid,
            bands: BTreeMap::new(),
        }
    }

    /// An image whose single band holds `value` at every pixel.
    pub fn constant(date: NaiveDate, grid: Arc<Grid>, band: &str, value: f64) -> Self {
        let values = vec![Some(value); grid.len()];
        let mut image = Self::new(date, grid);
        image.bands.insert(band.to_string(), values);
        image
    }

    /// Adds a band. Fails when the number of values does not match the grid.
    pub fn with_band(
        mut self,
        name: &str,
        values: Vec<Option<f64>>,
    ) -> Result<Self, CollectionError> {
        if values.len() != self.grid.len() {
            return Err(CollectionError::BandShape {
                band: name.to_string(),
                date: self.date,
                expected: self.grid.len(),
                found: values.len(),
            });
        }
        self.bands.insert(name.to_string(), values);
        Ok(self)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn band(&self, name: &str) -> Option<&[Option<f64>]> {
        self.bands.get(name).map(|v| v.as_slice())
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(|k| k.as_str())
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// 1-based ordinal day within the calendar year, before any leap adjustment.
    pub fn raw_day_of_year(&self) -> u16 {
        self.date.ordinal() as u16
    }

    pub fn adjusted_day_of_year(&self, rule: LeapRule) -> u16 {
        adjusted_day_of_year(self.date, rule)
    }

    pub fn is_leap_day(&self) -> bool {
        self.date.month() == 2 && self.date.day() == 29
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_grid_is_row_major() {
        let grid = Grid::regular(-1.0, 36.0, 0.25, 2, 3);
        let pixels: Vec<_> = grid.pixels().collect();
        assert_eq!(grid.len(), 6);
        assert_eq!(pixels[0], (-1.0, 36.0));
        assert_eq!(pixels[2], (-1.0, 36.5));
        assert_eq!(pixels[3], (-0.75, 36.0));
    }

    #[test]
    fn test_band_shape_is_checked() {
        let grid = Arc::new(Grid::regular(0.0, 0.0, 1.0, 2, 2));
        let date = NaiveDate::from_ymd_opt(2012, 2, 29).unwrap();
        let image = DailyImage::new(date, grid);
        assert!(image.is_leap_day());
        assert!(matches!(
            image.clone().with_band("total_precipitation", vec![Some(0.0); 3]),
            Err(CollectionError::BandShape { expected: 4, found: 3, .. })
        ));
        let image = image
            .with_band("total_precipitation", vec![Some(0.0); 4])
            .unwrap();
        assert_eq!(image.band_names().collect::<Vec<_>>(), vec!["total_precipitation"]);
    }

    #[test]
    fn test_derived_day_fields() {
        let grid = Arc::new(Grid::regular(0.0, 0.0, 1.0, 1, 1));
        let image = DailyImage::constant(
            NaiveDate::from_ymd_opt(2016, 3, 1).unwrap(),
            grid,
            "total_precipitation",
            0.001,
        );
        assert_eq!(image.year(), 2016);
        assert_eq!(image.raw_day_of_year(), 61);
        assert_eq!(image.adjusted_day_of_year(LeapRule::Mod4), 60);
        assert_eq!(image.band("total_precipitation").unwrap()[0], Some(0.001));
    }
}
