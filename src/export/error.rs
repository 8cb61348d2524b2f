use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create export folder '{0}'")]
    CreateFolder(PathBuf, #[source] std::io::Error),

    #[error("Failed to build export table")]
    Frame(#[source] PolarsError),

    #[error("Failed to write '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode CSV for '{0}'")]
    CsvEncode(PathBuf, #[source] PolarsError),

    #[error("Failed to move finished export into place at '{0}'")]
    Persist(PathBuf, #[source] std::io::Error),

    #[error("Failed to serialize chart")]
    Json(#[from] serde_json::Error),

    #[error("HTML charts need the `plotting` feature")]
    PlottingDisabled,

    #[error("Export task '{0}' did not finish")]
    TaskJoin(String, #[source] tokio::task::JoinError),

    #[error("Export '{description}' failed: {reason}")]
    Failed { description: String, reason: String },
}
