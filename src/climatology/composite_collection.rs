//! Per-pixel multi-year means grouped by day of year, and their reduction to a
//! single regional value per day.

use crate::climatology::region_mask::RegionMask;
use crate::collection::error::CollectionError;
use crate::collection::image_collection::{TaggedCollection, DOY_COLUMN, LAT_COLUMN, LON_COLUMN};
use crate::error::ClimatologyError;
use crate::types::composite::Composite;
use crate::types::sample::{RegionalSample, RegionalSeries};
use log::debug;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Name of the column produced by the regional reduction.
pub const RAINFALL_CM_COLUMN: &str = "rainfall_cm";

const METRES_TO_CENTIMETRES: f64 = 100.0;

/// Name of the centimetre band derived from `band` by
/// [`CompositeCollection::to_centimeters`].
pub fn centimeter_band(band: &str) -> String {
    format!("{}_cm", band)
}

/// One composite per day of year: for each pixel, the mean of every band over
/// all images sharing that `doy`.
#[derive(Clone)]
pub struct CompositeCollection {
    /// Columns `doy`, `lat`, `lon` and one per band.
    pub frame: LazyFrame,
    bands: Vec<String>,
}

impl CompositeCollection {
    /// Groups the tagged images by `doy` and averages each band per pixel.
    ///
    /// Null band values are ignored by the mean. A pixel whose values are all
    /// null for a day keeps a null mean.
    pub fn from_tagged(tagged: &TaggedCollection) -> Self {
        let means: Vec<Expr> = tagged
            .bands()
            .iter()
            .map(|band| col(band.as_str()).mean().alias(band.as_str()))
            .collect();
        let frame = tagged
            .frame
            .clone()
            .group_by([col(DOY_COLUMN), col(LAT_COLUMN), col(LON_COLUMN)])
            .agg(means)
            .with_column(col(DOY_COLUMN).cast(DataType::Int32));
        Self {
            frame,
            bands: tagged.bands().to_vec(),
        }
    }

    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    /// Adds a `<band>_cm` band holding `band` multiplied by 100. Every other
    /// band is left untouched.
    pub fn to_centimeters(&self, band: &str) -> Result<Self, CollectionError> {
        if !self.bands.iter().any(|b| b == band) {
            return Err(CollectionError::MissingBand {
                band: band.to_string(),
                available: self.bands.clone(),
            });
        }
        let target = centimeter_band(band);
        let frame = self
            .frame
            .clone()
            .with_column((col(band) * lit(METRES_TO_CENTIMETRES)).alias(target.as_str()));
        let mut bands = self.bands.clone();
        if !bands.contains(&target) {
            bands.push(target);
        }
        Ok(Self { frame, bands })
    }

    /// Evaluates every composite, ordered by day of year.
    pub fn collect(&self) -> Result<Vec<Composite>, ClimatologyError> {
        let df = self
            .frame
            .clone()
            .sort(
                [DOY_COLUMN, LAT_COLUMN, LON_COLUMN],
                SortMultipleOptions::default(),
            )
            .collect()?;

        let doys = df.column(DOY_COLUMN)?.i32()?;
        let lats = df.column(LAT_COLUMN)?.f64()?;
        let lons = df.column(LON_COLUMN)?.f64()?;
        let mut band_columns = Vec::with_capacity(self.bands.len());
        for band in &self.bands {
            band_columns.push((band.as_str(), df.column(band)?.f64()?));
        }

        let mut composites: Vec<Composite> = Vec::new();
        for idx in 0..df.height() {
            let (Some(doy), Some(lat), Some(lon)) = (doys.get(idx), lats.get(idx), lons.get(idx))
            else {
                continue;
            };
            let doy = doy as u16;
            if composites.last().map(|c| c.doy) != Some(doy) {
                composites.push(Composite {
                    doy,
                    lats: Vec::new(),
                    lons: Vec::new(),
                    bands: self
                        .bands
                        .iter()
                        .map(|band| (band.clone(), Vec::new()))
                        .collect::<BTreeMap<_, _>>(),
                });
            }
            if let Some(composite) = composites.last_mut() {
                composite.lats.push(lat);
                composite.lons.push(lon);
                for (band, values) in &band_columns {
                    if let Some(column) = composite.bands.get_mut(*band) {
                        column.push(values.get(idx));
                    }
                }
            }
        }
        Ok(composites)
    }

    /// Averages `band` over the pixels in `mask` for every day of year.
    ///
    /// The mean is unweighted over the masked pixels and ignores nulls. A day
    /// with no valid pixel yields a sample with `rainfall_cm == None`.
    pub fn reduce_region(
        &self,
        mask: &RegionMask,
        band: &str,
    ) -> Result<RegionalSeries, ClimatologyError> {
        if !self.bands.iter().any(|b| b == band) {
            return Err(CollectionError::MissingBand {
                band: band.to_string(),
                available: self.bands.clone(),
            }
            .into());
        }
        debug!(
            "Reducing band '{}' over {} masked pixels",
            band,
            mask.len()
        );

        let df = self
            .frame
            .clone()
            .join(
                mask.to_frame()?.lazy(),
                [col(LAT_COLUMN), col(LON_COLUMN)],
                [col(LAT_COLUMN), col(LON_COLUMN)],
                JoinArgs::new(JoinType::Inner),
            )
            .group_by([col(DOY_COLUMN)])
            .agg([col(band).mean().alias(RAINFALL_CM_COLUMN)])
            .sort([DOY_COLUMN], SortMultipleOptions::default())
            .collect()?;

        let doys = df.column(DOY_COLUMN)?.i32()?;
        let values = df.column(RAINFALL_CM_COLUMN)?.f64()?;
        let samples = doys
            .into_iter()
            .zip(values)
            .filter_map(|(doy, rainfall_cm)| {
                Some(RegionalSample {
                    doy: u16::try_from(doy?).ok()?,
                    rainfall_cm,
                })
            })
            .collect();
        Ok(RegionalSeries::new(samples))
    }
}
