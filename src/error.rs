use crate::boundaries::error::RegionError;
use crate::collection::error::CollectionError;
use crate::export::error::ExportError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimatologyError {
    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Export(#[from] ExportError),

    /// Any failure raised while the lazy query plan is evaluated.
    #[error("Upstream evaluation failed: {0}")]
    Evaluation(#[from] PolarsError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Climatology is incomplete (missing days of year {missing:?}, duplicated {duplicated:?})")]
    IncompleteClimatology {
        missing: Vec<u16>,
        duplicated: Vec<u16>,
    },

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
