use crate::export::error::ExportError;
use crate::export::job::ExportJob;
use crate::types::sample::RegionalSeries;
use log::info;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

/// Folder exports land in unless another is configured.
pub const DEFAULT_EXPORT_FOLDER: &str = "Earth Engine";

pub const RAINFALL_COLUMN: &str = "rainfall";
pub const DAY_OF_YEAR_COLUMN: &str = "doy";

/// Describes a CSV export of a regional rainfall series.
///
/// The file is named `<prefix>_rainfall.csv` and holds one row per day of
/// year in ascending order. Only the `rainfall` column is written unless
/// [`with_day_of_year`](CsvExport::with_day_of_year) is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    description: String,
    folder: PathBuf,
    include_day_of_year: bool,
}

impl CsvExport {
    pub fn new(file_name_prefix: &str, folder: impl Into<PathBuf>) -> Self {
        Self {
            description: format!("{}_rainfall", file_name_prefix),
            folder: folder.into(),
            include_day_of_year: false,
        }
    }

    /// Adds a leading `doy` column.
    pub fn with_day_of_year(mut self, include: bool) -> Self {
        self.include_day_of_year = include;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.description)
    }

    pub fn destination(&self) -> PathBuf {
        self.folder.join(self.file_name())
    }

    /// The table that will be written.
    pub fn to_frame(&self, series: &RegionalSeries) -> PolarsResult<DataFrame> {
        let mut columns = Vec::with_capacity(2);
        if self.include_day_of_year {
            let days: Vec<u32> = series.days().into_iter().map(u32::from).collect();
            columns.push(Column::new(DAY_OF_YEAR_COLUMN.into(), days));
        }
        columns.push(Column::new(RAINFALL_COLUMN.into(), series.values()));
        DataFrame::new(columns)
    }

    /// Starts writing `series` in the background.
    ///
    /// Problems found before the job starts (the folder cannot be created,
    /// the table cannot be built) are returned here. Failures while writing
    /// surface through the returned [`ExportJob`]. The file is written to a
    /// temporary sibling and renamed into place, so an existing export is
    /// replaced whole or not at all.
    pub async fn submit(&self, series: &RegionalSeries) -> Result<ExportJob, ExportError> {
        fs::create_dir_all(&self.folder)
            .await
            .map_err(|e| ExportError::CreateFolder(self.folder.clone(), e))?;
        let mut df = self.to_frame(series).map_err(ExportError::Frame)?;

        let folder = self.folder.clone();
        let destination = self.destination();
        info!(
            "Submitting export '{}' ({} rows) to {:?}",
            self.description,
            df.height(),
            destination
        );
        Ok(ExportJob::spawn(self.description.clone(), move || {
            let mut temp_file = NamedTempFile::new_in(&folder)
                .map_err(|e| ExportError::Write(destination.clone(), e))?;
            CsvWriter::new(&mut temp_file)
                .include_header(true)
                .finish(&mut df)
                .map_err(|e| ExportError::CsvEncode(destination.clone(), e))?;
            temp_file
                .persist(&destination)
                .map_err(|e| ExportError::Persist(destination.clone(), e.error))?;
            Ok(destination)
        }))
    }
}
