use geo::{BoundingRect, Centroid, Contains, MultiPolygon, Point, Rect};

/// A named country boundary, the spatial domain of the regional reduction.
///
/// Coordinates are longitude (x) / latitude (y) in degrees, as in GeoJSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    name: String,
    prefix: String,
    geometry: MultiPolygon<f64>,
}

impl Region {
    pub fn new(name: &str, prefix: &str, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            geometry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short code (ISO 3166-1 alpha-3) used only to name output files.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    pub fn centroid(&self) -> Option<Point<f64>> {
        self.geometry.centroid()
    }

    /// Whether a pixel centre lies inside the boundary. `lon` may use either
    /// the -180..180 or the 0..360 convention.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.geometry
            .contains(&Point::new(normalize_lon(lon), lat))
    }
}

/// Maps a longitude onto -180..180.
pub(crate) fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}
