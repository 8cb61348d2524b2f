use crate::download::DownloadError;
use chrono::NaiveDate;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Image collection is empty")]
    Empty,

    #[error("Image collection has no images between {0}")]
    EmptyAfterFilter(String),

    #[error("Image collection is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Image collection has no band columns")]
    NoBands,

    #[error("Band '{band}' not found, available bands: {available:?}")]
    MissingBand {
        band: String,
        available: Vec<String>,
    },

    #[error("Band '{band}' of image {date} has {found} values, grid has {expected} pixels")]
    BandShape {
        band: String,
        date: NaiveDate,
        expected: usize,
        found: usize,
    },

    #[error("Unsupported image file format for '{0}' (expected .parquet or .csv)")]
    UnsupportedFormat(PathBuf),

    #[error("Failed to read image collection schema")]
    Schema(#[source] PolarsError),

    #[error("Failed to build image collection frame")]
    Frame(#[source] PolarsError),

    #[error("Failed to scan image file '{0}'")]
    Scan(PathBuf, #[source] PolarsError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("I/O error processing CSV data from {source_name}")]
    CsvReadIo {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing error processing CSV data from {source_name}")]
    CsvReadPolars {
        source_name: String,
        #[source]
        source: PolarsError,
    },

    #[error("I/O error writing parquet cache file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing parquet cache file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
