//! Administrative boundary features (one polygon set per country) and the
//! lookup that turns a country name into a [`Region`].

use crate::boundaries::error::RegionError;
use crate::download::download;
use crate::types::data_source::DataSource;
use crate::types::region::Region;
use crate::utils::cache_file_name;
use bincode::config::{Configuration, Fixint, LittleEndian};
use geo::{LineString, MultiPolygon, Polygon};
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Property holding the country name in the FAO GAUL level-0 dataset.
pub const DEFAULT_NAME_FIELD: &str = "ADM0_NAME";

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

type Ring = Vec<[f64; 2]>;

/// One named boundary: a list of polygons, each an exterior ring followed by its holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryFeature {
    pub name: String,
    pub polygons: Vec<Vec<Ring>>,
}

impl BoundaryFeature {
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(
            self.polygons
                .iter()
                .filter_map(|rings| {
                    let (exterior, interiors) = rings.split_first()?;
                    Some(Polygon::new(
                        LineString::from(exterior.clone()),
                        interiors.iter().cloned().map(LineString::from).collect(),
                    ))
                })
                .collect(),
        )
    }
}

// --- GeoJSON wire format ---

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
    #[serde(other)]
    Unsupported,
}

/// The reference set of country boundaries.
#[derive(Debug, Clone)]
pub struct BoundarySet {
    name_field: String,
    features: Vec<BoundaryFeature>,
}

impl BoundarySet {
    pub fn new(name_field: &str, features: Vec<BoundaryFeature>) -> Self {
        Self {
            name_field: name_field.to_string(),
            features,
        }
    }

    /// Parses a GeoJSON `FeatureCollection`, keeping features that carry a
    /// string `name_field` property and a polygonal geometry.
    pub fn from_geojson_bytes(bytes: &[u8], name_field: &str) -> Result<Self, RegionError> {
        let collection: FeatureCollection = serde_json::from_slice(bytes)?;
        let total = collection.features.len();

        let features: Vec<BoundaryFeature> = collection
            .features
            .into_iter()
            .filter_map(|feature| {
                let name = feature
                    .properties
                    .as_ref()
                    .and_then(|p| p.get(name_field))
                    .and_then(Value::as_str)?
                    .to_string();
                let polygons = match feature.geometry? {
                    Geometry::Polygon { coordinates } => vec![coordinates],
                    Geometry::MultiPolygon { coordinates } => coordinates,
                    Geometry::Unsupported => {
                        debug!("Skipping boundary '{}' with unsupported geometry", name);
                        return None;
                    }
                };
                Some(BoundaryFeature { name, polygons })
            })
            .collect();

        if features.is_empty() {
            return Err(RegionError::NoFeatures);
        }
        debug!(
            "Parsed {} of {} boundary features using field '{}'",
            features.len(),
            total,
            name_field
        );
        Ok(Self::new(name_field, features))
    }

    /// Loads boundaries from a local GeoJSON file or a (possibly gzipped) URL.
    ///
    /// Remote datasets are parsed once and cached in `cache_dir` in bincode form.
    pub async fn load(
        source: &DataSource,
        name_field: &str,
        cache_dir: &Path,
        client: &Client,
    ) -> Result<Self, RegionError> {
        match source {
            DataSource::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| RegionError::FileRead(path.clone(), e))?;
                let name_field = name_field.to_string();
                tokio::task::spawn_blocking(move || Self::from_geojson_bytes(&bytes, &name_field))
                    .await?
            }
            DataSource::Url(url) => {
                let cache_key = format!("{}-{}", name_field, url);
                let cache_file = cache_dir.join(cache_file_name("boundaries", &cache_key, "bin"));

                if cache_file.exists() {
                    info!("Cache hit for boundaries at {:?}", cache_file);
                    let path_clone = cache_file.clone();
                    let features =
                        tokio::task::spawn_blocking(move || Self::get_cached_features(&path_clone))
                            .await??;
                    return Ok(Self::new(name_field, features));
                }

                warn!("Cache miss for boundaries from {}. Downloading.", url);
                let bytes = download(client, url).await?;
                let name_field_owned = name_field.to_string();
                let set = tokio::task::spawn_blocking(move || {
                    Self::from_geojson_bytes(&bytes, &name_field_owned)
                })
                .await??;
                Self::cache_features(set.features.clone(), &cache_file).await?;
                Ok(set)
            }
        }
    }

    fn get_cached_features(cache_path: &Path) -> Result<Vec<BoundaryFeature>, RegionError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| RegionError::CacheRead(cache_path.to_path_buf(), e))?;
        let (features, _) =
            bincode::serde::decode_from_slice::<Vec<BoundaryFeature>, _>(&bytes, BINCODE_CONFIG)
                .map_err(|e| RegionError::CacheDecode(cache_path.to_path_buf(), Box::from(e)))?;
        Ok(features)
    }

    async fn cache_features(
        features: Vec<BoundaryFeature>,
        cache_path: &Path,
    ) -> Result<(), RegionError> {
        let path = cache_path.to_path_buf();
        let written = tokio::task::spawn_blocking(move || {
            let encoded = bincode::serde::encode_to_vec(features, BINCODE_CONFIG)
                .map_err(|e| RegionError::CacheEncode(Box::new(e)))?;
            // Readers only ever see a complete cache file.
            let write_error = |e| RegionError::CacheWrite(path.clone(), e);
            let folder = path.parent().unwrap_or_else(|| Path::new("."));
            let mut temp_file = NamedTempFile::new_in(folder).map_err(write_error)?;
            temp_file.write_all(&encoded).map_err(write_error)?;
            temp_file
                .persist(&path)
                .map_err(|e| RegionError::CacheWrite(path.clone(), e.error))?;
            Ok::<usize, RegionError>(encoded.len())
        })
        .await??;
        info!(
            "Wrote boundary cache ({} bytes) to {}",
            written,
            cache_path.display()
        );
        Ok(())
    }

    pub fn name_field(&self) -> &str {
        &self.name_field
    }

    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Resolves `country_name` (exact match) to its boundary.
    ///
    /// No match is an error. When several features share the name the first
    /// one is used and a warning is logged.
    pub fn resolve(&self, country_name: &str, country_prefix: &str) -> Result<Region, RegionError> {
        if country_name.trim().is_empty() {
            return Err(RegionError::EmptyName);
        }

        let mut matches = self.features.iter().filter(|f| f.name == country_name);
        let Some(first) = matches.next() else {
            return Err(RegionError::NoMatch {
                field: self.name_field.clone(),
                name: country_name.to_string(),
                available: self.features.len(),
            });
        };

        let extra = matches.count();
        if extra > 0 {
            warn!(
                "{} boundary features match {} == '{}'; using the first one",
                extra + 1,
                self.name_field,
                country_name
            );
        }

        let region = Region::new(country_name, country_prefix, first.to_multi_polygon());
        if let Some(bounds) = region.bounds() {
            info!(
                "Resolved '{}' to {} polygon(s), bounds lon {:.3}..{:.3}, lat {:.3}..{:.3}",
                country_name,
                region.geometry().0.len(),
                bounds.min().x,
                bounds.max().x,
                bounds.min().y,
                bounds.max().y
            );
        }
        Ok(region)
    }
}
