//! Selects the raster pixels that make up a region at a given ground sampling
//! distance.

use crate::boundaries::error::RegionError;
use crate::collection::image_collection::{LAT_COLUMN, LON_COLUMN};
use crate::types::region::{normalize_lon, Region};
use haversine::{distance, Location, Units};
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use polars::prelude::{Column, DataFrame, PolarsResult};
use rstar::RTree;
use std::collections::BTreeMap;

/// Ground sampling distance used for the regional mean, in metres.
pub const DEFAULT_SCALE_M: f64 = 10_000.0;

/// Pixel centres included in a regional reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask {
    /// (lat, lon) exactly as they appear in the image collection.
    pixels: Vec<(f64, f64)>,
    stride: (usize, usize),
    fallback: bool,
}

impl RegionMask {
    /// Builds the mask for `region` from the collection's pixel centres.
    ///
    /// When the native pixel spacing is finer than `scale_m` the grid is
    /// thinned to roughly one pixel per `scale_m` along each axis. A pixel is
    /// kept when its centre falls inside the boundary; if none does (a region
    /// smaller than one pixel), the pixel nearest the region centroid is used.
    pub fn new(region: &Region, pixels: &[(f64, f64)], scale_m: f64) -> Result<Self, RegionError> {
        if pixels.is_empty() {
            return Err(RegionError::NoPixels(region.name().to_string()));
        }

        let lat_index = axis_index(pixels.iter().map(|p| p.0));
        let lon_index = axis_index(pixels.iter().map(|p| p.1));
        let reference_lat = region
            .centroid()
            .map(|c| c.y())
            .unwrap_or_else(|| pixels[0].0);
        let lat_km = min_step(&lat_index)
            .map(|step| ground_km((reference_lat, 0.0), (reference_lat + step, 0.0)));
        let lon_km =
            min_step(&lon_index).map(|step| ground_km((reference_lat, 0.0), (reference_lat, step)));
        let stride = (stride_for(lat_km, scale_m), stride_for(lon_km, scale_m));

        let candidates: Vec<[f64; 2]> = pixels
            .iter()
            .filter(|(lat, lon)| {
                lat_index[&OrderedFloat(*lat)] % stride.0 == 0
                    && lon_index[&OrderedFloat(*lon)] % stride.1 == 0
            })
            .map(|&(lat, lon)| [normalize_lon(lon), lat])
            .collect();
        // Lookup back to the collection's own longitude values for the join.
        let original_lon: BTreeMap<OrderedFloat<f64>, f64> = pixels
            .iter()
            .map(|&(_, lon)| (OrderedFloat(normalize_lon(lon)), lon))
            .collect();
        let to_pixel = |point: &[f64; 2]| -> (f64, f64) {
            let lon = original_lon
                .get(&OrderedFloat(point[0]))
                .copied()
                .unwrap_or(point[0]);
            (point[1], lon)
        };

        let mut inside: Vec<(f64, f64)> = match region.bounds() {
            Some(bounds) => candidates
                .iter()
                .filter(|p| {
                    (bounds.min().x..=bounds.max().x).contains(&p[0])
                        && (bounds.min().y..=bounds.max().y).contains(&p[1])
                })
                .filter(|p| region.contains(p[1], p[0]))
                .map(to_pixel)
                .collect(),
            None => Vec::new(),
        };
        inside.sort_by(|a, b| {
            OrderedFloat(a.0)
                .cmp(&OrderedFloat(b.0))
                .then(OrderedFloat(a.1).cmp(&OrderedFloat(b.1)))
        });

        debug!(
            "Sampling stride for '{}' is {} x {} pixels at {} m",
            region.name(),
            stride.0,
            stride.1,
            scale_m
        );

        if !inside.is_empty() {
            info!(
                "Region '{}' covers {} of {} pixels",
                region.name(),
                inside.len(),
                pixels.len()
            );
            return Ok(Self {
                pixels: inside,
                stride,
                fallback: false,
            });
        }

        let no_pixels = || RegionError::NoPixels(region.name().to_string());
        let (centroid, bounds) = region
            .centroid()
            .zip(region.bounds())
            .ok_or_else(no_pixels)?;
        let all: Vec<[f64; 2]> = pixels
            .iter()
            .map(|&(lat, lon)| [normalize_lon(lon), lat])
            .collect();
        let tree = RTree::bulk_load(all);
        let point = tree
            .nearest_neighbor(&[centroid.x(), centroid.y()])
            .ok_or_else(no_pixels)?;

        // The nearest pixel only stands in for the region when its footprint
        // can reach the boundary; otherwise the region lies outside the grid.
        let reach_km = [scale_m / 1000.0, lat_km.unwrap_or(0.0), lon_km.unwrap_or(0.0)]
            .into_iter()
            .fold(0.0, f64::max);
        let gap_km = ground_km(
            (point[1], point[0]),
            (
                point[1].clamp(bounds.min().y, bounds.max().y),
                point[0].clamp(bounds.min().x, bounds.max().x),
            ),
        );
        if gap_km > reach_km {
            warn!(
                "Region '{}' lies {:.0} km from the nearest pixel, beyond the {:.0} km pixel footprint",
                region.name(),
                gap_km,
                reach_km
            );
            return Err(no_pixels());
        }

        let nearest = to_pixel(point);
        warn!(
            "No pixel centre falls inside '{}'; using the pixel nearest its centroid at ({}, {})",
            region.name(),
            nearest.0,
            nearest.1
        );
        Ok(Self {
            pixels: vec![nearest],
            stride,
            fallback: true,
        })
    }

    pub fn pixels(&self) -> &[(f64, f64)] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Sampling stride along (lat, lon), in pixels.
    pub fn stride(&self) -> (usize, usize) {
        self.stride
    }

    /// True when no pixel centre fell inside the region.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub(crate) fn to_frame(&self) -> PolarsResult<DataFrame> {
        let (lats, lons): (Vec<f64>, Vec<f64>) = self.pixels.iter().copied().unzip();
        DataFrame::new(vec![
            Column::new(LAT_COLUMN.into(), lats),
            Column::new(LON_COLUMN.into(), lons),
        ])
    }
}

/// Position of each distinct coordinate along one axis.
fn axis_index(values: impl Iterator<Item = f64>) -> BTreeMap<OrderedFloat<f64>, usize> {
    let mut index: BTreeMap<OrderedFloat<f64>, usize> =
        values.map(|v| (OrderedFloat(v), 0)).collect();
    for (position, slot) in index.values_mut().enumerate() {
        *slot = position;
    }
    index
}

/// Smallest spacing between neighbouring coordinates on one axis.
fn min_step(index: &BTreeMap<OrderedFloat<f64>, usize>) -> Option<f64> {
    let step = index
        .keys()
        .zip(index.keys().skip(1))
        .map(|(a, b)| b.0 - a.0)
        .fold(f64::INFINITY, f64::min);
    (step.is_finite() && step > 0.0).then_some(step)
}

fn stride_for(pixel_km: Option<f64>, scale_m: f64) -> usize {
    match pixel_km {
        Some(km) if km > 0.0 => ((scale_m / 1000.0) / km).round().max(1.0) as usize,
        _ => 1,
    }
}

fn ground_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    distance(
        Location {
            latitude: a.0,
            longitude: a.1,
        },
        Location {
            latitude: b.0,
            longitude: b.1,
        },
        Units::Kilometers,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::image::Grid;
    use geo::{polygon, MultiPolygon};

    fn square_region(x0: f64, y0: f64, size: f64) -> Region {
        Region::new(
            "Square",
            "SQR",
            MultiPolygon::new(vec![polygon![
                (x: x0, y: y0),
                (x: x0 + size, y: y0),
                (x: x0 + size, y: y0 + size),
                (x: x0, y: y0 + size),
                (x: x0, y: y0),
            ]]),
        )
    }

    #[test]
    fn test_keeps_pixels_inside_region() {
        // 0.25 degree grid is ~28 km, coarser than 10 km: no thinning.
        let grid = Grid::regular(-2.0, 34.0, 0.25, 17, 17);
        let pixels: Vec<_> = grid.pixels().collect();
        let mask = RegionMask::new(&square_region(35.1, -0.9, 1.0), &pixels, DEFAULT_SCALE_M).unwrap();
        assert_eq!(mask.stride(), (1, 1));
        assert!(!mask.is_fallback());
        // Centres at 35.25..36.0 and -0.75..0.0 in steps of 0.25.
        assert_eq!(mask.len(), 16);
        assert!(mask
            .pixels()
            .iter()
            .all(|&(lat, lon)| (-0.9..=0.1).contains(&lat) && (35.1..=36.1).contains(&lon)));
    }

    #[test]
    fn test_fine_grid_is_thinned_to_scale() {
        // 0.01 degree (~1.1 km) pixels sampled every ~10 km.
        let grid = Grid::regular(0.0, 0.0, 0.01, 100, 100);
        let pixels: Vec<_> = grid.pixels().collect();
        let mask = RegionMask::new(&square_region(-0.005, -0.005, 1.0), &pixels, DEFAULT_SCALE_M).unwrap();
        assert_eq!(mask.stride(), (9, 9));
        assert_eq!(mask.len(), 12 * 12);
    }

    #[test]
    fn test_small_region_falls_back_to_nearest_pixel() {
        let grid = Grid::regular(0.0, 0.0, 1.0, 3, 3);
        let pixels: Vec<_> = grid.pixels().collect();
        let mask = RegionMask::new(&square_region(1.1, 1.1, 0.2), &pixels, DEFAULT_SCALE_M).unwrap();
        assert!(mask.is_fallback());
        assert_eq!(mask.pixels(), &[(1.0, 1.0)]);
    }

    #[test]
    fn test_region_outside_grid_has_no_pixels() {
        // Grid spans 0..2 degrees; the region sits near 50E 50N.
        let grid = Grid::regular(0.0, 0.0, 1.0, 3, 3);
        let pixels: Vec<_> = grid.pixels().collect();
        assert!(matches!(
            RegionMask::new(&square_region(50.0, 50.0, 1.0), &pixels, DEFAULT_SCALE_M),
            Err(RegionError::NoPixels(name)) if name == "Square"
        ));
    }

    #[test]
    fn test_fallback_reaches_one_pixel_beyond_grid_edge() {
        // Half a pixel past the last column is still within its footprint,
        // three pixels past it is not.
        let grid = Grid::regular(0.0, 0.0, 1.0, 3, 3);
        let pixels: Vec<_> = grid.pixels().collect();
        let near = RegionMask::new(&square_region(2.5, 0.9, 0.2), &pixels, DEFAULT_SCALE_M).unwrap();
        assert!(near.is_fallback());
        assert_eq!(near.pixels(), &[(1.0, 2.0)]);
        assert!(matches!(
            RegionMask::new(&square_region(5.0, 0.9, 0.2), &pixels, DEFAULT_SCALE_M),
            Err(RegionError::NoPixels(_))
        ));
    }

    #[test]
    fn test_keeps_original_longitude_convention() {
        let grid = Grid::regular(0.0, 280.0, 1.0, 3, 3);
        let pixels: Vec<_> = grid.pixels().collect();
        let mask = RegionMask::new(&square_region(-80.5, -0.5, 1.0), &pixels, DEFAULT_SCALE_M).unwrap();
        assert_eq!(mask.pixels(), &[(0.0, 280.0)]);
    }

    #[test]
    fn test_empty_pixels_is_an_error() {
        assert!(matches!(
            RegionMask::new(&square_region(0.0, 0.0, 1.0), &[], DEFAULT_SCALE_M),
            Err(RegionError::NoPixels(_))
        ));
    }

    #[test]
    fn test_mask_frame_columns() {
        let grid = Grid::regular(0.0, 0.0, 1.0, 2, 2);
        let pixels: Vec<_> = grid.pixels().collect();
        let mask = RegionMask::new(&square_region(-0.5, -0.5, 2.0), &pixels, DEFAULT_SCALE_M).unwrap();
        let df = mask.to_frame().unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 2);
        assert!(df.column("lat").is_ok());
        assert!(df.column("lon").is_ok());
    }
}
