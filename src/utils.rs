use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "rainfall_climatology_cache";

pub fn get_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join(CACHE_DIR_NAME))
}

pub async fn ensure_cache_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!(
                        "Cache path exists but is not a directory: {}",
                        path.display()
                    ),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("Creating cache directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// Turns an arbitrary source string (usually a URL) into a file name that is
/// safe to use inside the cache directory.
///
/// The readable part is lossy (sanitized and truncated), so a hash of the full
/// source keeps distinct sources apart.
pub fn cache_file_name(prefix: &str, source: &str, extension: &str) -> String {
    let stem: String = source
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    // Keep the tail, which carries the distinguishing file name.
    let stem = match stem.char_indices().rev().nth(119) {
        Some((idx, _)) => &stem[idx..],
        None => stem.as_str(),
    };
    format!("{}-{}-{:016x}.{}", prefix, stem, fnv1a(source.as_bytes()), extension)
}

/// 64-bit FNV-1a. Stable across builds and platforms, unlike `DefaultHasher`.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET_BASIS, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}
