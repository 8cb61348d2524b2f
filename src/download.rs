//! Fetches remote datasets, transparently gunzipping `.gz` payloads.

use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::Client;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Data download or decompression failed for {0}")]
    DownloadIo(String, #[source] std::io::Error),
}

pub(crate) async fn download(client: &Client, url: &str) -> Result<Vec<u8>, DownloadError> {
    info!("Downloading data from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DownloadError::NetworkRequest(url.to_string(), e))?;

    let response = match response.error_for_status() {
        Ok(resp) => resp,
        Err(e) => {
            warn!("HTTP error for {}: {:?}", url, e);
            return Err(if let Some(status) = e.status() {
                DownloadError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                }
            } else {
                DownloadError::NetworkRequest(url.to_string(), e)
            });
        }
    };

    let stream = response
        .bytes_stream()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
    let mut stream_reader = StreamReader::new(stream);
    let mut bytes = Vec::new();

    let read = if is_gzip(url) {
        GzipDecoder::new(stream_reader)
            .read_to_end(&mut bytes)
            .await
    } else {
        stream_reader.read_to_end(&mut bytes).await
    };
    read.map_err(|e| DownloadError::DownloadIo(url.to_string(), e))?;

    info!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes)
}

fn is_gzip(url: &str) -> bool {
    url.split('?')
        .next()
        .is_some_and(|path| path.ends_with(".gz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_gzip_ignores_query() {
        assert!(is_gzip("https://example.org/a.csv.gz"));
        assert!(is_gzip("https://example.org/a.csv.gz?dl=1"));
        assert!(!is_gzip("https://example.org/a.csv"));
    }
}
