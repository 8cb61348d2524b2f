use std::collections::BTreeMap;

/// The multi-year, per-pixel mean raster for one day of year.
///
/// Pixels are ordered by latitude, then longitude. Every band vector is
/// aligned with `lats`/`lons`.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub doy: u16,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub bands: BTreeMap<String, Vec<Option<f64>>>,
}

impl Composite {
    pub fn band(&self, name: &str) -> Option<&[Option<f64>]> {
        self.bands.get(name).map(|v| v.as_slice())
    }

    pub fn pixel_count(&self) -> usize {
        self.lats.len()
    }
}
