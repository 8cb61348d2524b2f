use crate::download::DownloadError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Country name is empty")]
    EmptyName,

    #[error("No boundary feature has {field} == '{name}' ({available} features searched)")]
    NoMatch {
        field: String,
        name: String,
        available: usize,
    },

    #[error("Boundary dataset contains no usable polygon features")]
    NoFeatures,

    #[error("Region '{0}' overlaps no pixels of the image collection")]
    NoPixels(String),

    #[error("Failed to read boundary file '{0}'")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to read cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode cache data from '{0}'")]
    CacheDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode cache data")]
    CacheEncode(#[source] Box<bincode::error::EncodeError>),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Failed to parse GeoJSON boundary data")]
    JsonParse(#[from] serde_json::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
