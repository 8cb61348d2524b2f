//! Where an input dataset (image collection or boundary set) is read from.

use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A local file or a remote URL holding an input dataset.
///
/// Remote sources are downloaded once and cached; a `.gz` suffix on the URL
/// means the payload is gzip-compressed.
///
/// # Examples
///
/// ```
/// use rainfall_climatology::DataSource;
///
/// let remote: DataSource = "https://example.org/era5_daily.csv.gz".parse().unwrap();
/// assert!(remote.is_remote());
///
/// let local: DataSource = "data/era5_daily.parquet".parse().unwrap();
/// assert!(!local.is_remote());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Path(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn is_remote(&self) -> bool {
        matches!(self, DataSource::Url(_))
    }

    /// File name (or last URL segment) without any query string.
    pub(crate) fn file_name(&self) -> String {
        match self {
            DataSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            DataSource::Url(url) => url
                .split('?')
                .next()
                .and_then(|u| u.rsplit('/').next())
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl FromStr for DataSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(DataSource::Url(s.to_string()))
        } else {
            Ok(DataSource::Path(PathBuf::from(s)))
        }
    }
}

impl From<&Path> for DataSource {
    fn from(path: &Path) -> Self {
        DataSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for DataSource {
    fn from(path: PathBuf) -> Self {
        DataSource::Path(path)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Path(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => write!(f, "{}", url),
        }
    }
}
