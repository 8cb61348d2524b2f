use crate::collection::error::CollectionError;
use crate::collection::image_collection::ImageCollection;
use crate::download::download;
use crate::types::data_source::DataSource;
use crate::utils::cache_file_name;
use log::{info, warn};
use polars::prelude::*;
use reqwest::Client;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::{fs, task};

/// Opens image collections from local files, or downloads remote CSV and
/// parquet collections once and keeps them as parquet in the cache directory.
pub struct ImageLoader {
    cache_dir: PathBuf,
    download_client: Client,
}

impl ImageLoader {
    pub fn new(cache_dir: &Path, download_client: Client) -> ImageLoader {
        ImageLoader {
            cache_dir: cache_dir.to_path_buf(),
            download_client,
        }
    }

    pub async fn load(&self, source: &DataSource) -> Result<ImageCollection, CollectionError> {
        match source {
            DataSource::Path(path) => open_local(path),
            DataSource::Url(url) => {
                let format = RemoteFormat::from_file_name(&source.file_name())
                    .ok_or_else(|| CollectionError::UnsupportedFormat(PathBuf::from(url)))?;
                let parquet_path = self.cache_path(url);
                if fs::metadata(&parquet_path).await.is_ok() {
                    info!("Cache hit for image collection {} at {:?}", url, parquet_path);
                } else {
                    warn!(
                        "Cache miss for image collection {}. Downloading and processing.",
                        url
                    );
                    let raw_bytes = download(&self.download_client, url).await?;
                    fs::create_dir_all(&self.cache_dir)
                        .await
                        .map_err(|e| CollectionError::CacheDirCreation(self.cache_dir.clone(), e))?;
                    match format {
                        RemoteFormat::Parquet => Self::cache_bytes(raw_bytes, &parquet_path).await?,
                        RemoteFormat::Csv => {
                            let df = Self::csv_to_dataframe(raw_bytes, source.file_name()).await?;
                            Self::cache_dataframe(df, &parquet_path).await?;
                        }
                    }
                    info!("Cached image collection {} to {:?}", url, parquet_path);
                }
                ImageCollection::scan_parquet(&parquet_path)
            }
        }
    }

    fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(cache_file_name("images", url, "parquet"))
    }

    /// Parses CSV bytes (with header) into a DataFrame on a blocking task.
    async fn csv_to_dataframe(
        bytes: Vec<u8>,
        source_name: String,
    ) -> Result<DataFrame, CollectionError> {
        task::spawn_blocking(move || {
            let io_error = |e| CollectionError::CsvReadIo {
                source_name: source_name.clone(),
                source: e,
            };
            let mut temp_file = NamedTempFile::new().map_err(io_error)?;
            temp_file.write_all(&bytes).map_err(io_error)?;
            temp_file.flush().map_err(io_error)?;

            CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
                .and_then(|reader| reader.finish())
                .map_err(|e| CollectionError::CsvReadPolars {
                    source_name: source_name.clone(),
                    source: e,
                })
        })
        .await?
    }

    async fn cache_dataframe(mut df: DataFrame, path: &Path) -> Result<(), CollectionError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            write_atomically(&path_buf, |file| {
                ParquetWriter::new(file)
                    .with_compression(ParquetCompression::Snappy)
                    .finish(&mut df)
                    .map(|_| ())
                    .map_err(|e| CollectionError::ParquetWritePolars(path_buf.clone(), e))
            })
        })
        .await??;
        Ok(())
    }

    /// Stores an already-parquet download as is.
    async fn cache_bytes(bytes: Vec<u8>, path: &Path) -> Result<(), CollectionError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            write_atomically(&path_buf, |file| {
                file.write_all(&bytes)
                    .map_err(|e| CollectionError::ParquetWriteIo(path_buf.clone(), e))
            })
        })
        .await??;
        Ok(())
    }
}

/// Payload formats accepted from a URL, judged by its file name with any
/// `.gz` suffix removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteFormat {
    Csv,
    Parquet,
}

impl RemoteFormat {
    fn from_file_name(file_name: &str) -> Option<Self> {
        let name = file_name.to_ascii_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".parquet") {
            Some(RemoteFormat::Parquet)
        } else if name.ends_with(".csv") {
            Some(RemoteFormat::Csv)
        } else {
            None
        }
    }
}

/// Writes `path` through a temporary file in the same folder, so a reader
/// never finds a partially written cache entry.
fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut File) -> Result<(), CollectionError>,
) -> Result<(), CollectionError> {
    let io_error = |e| CollectionError::ParquetWriteIo(path.to_path_buf(), e);
    let folder = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp_file = NamedTempFile::new_in(folder).map_err(io_error)?;
    write(temp_file.as_file_mut())?;
    temp_file
        .persist(path)
        .map_err(|e| CollectionError::ParquetWriteIo(path.to_path_buf(), e.error))?;
    Ok(())
}

fn open_local(path: &Path) -> Result<ImageCollection, CollectionError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("parquet") => ImageCollection::scan_parquet(path),
        Some("csv") => ImageCollection::scan_csv(path),
        _ => Err(CollectionError::UnsupportedFormat(path.to_path_buf())),
    }
}
