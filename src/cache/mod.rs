use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// On-disk store of downloaded tiles, keyed by tile URL.
///
/// Living inside the working directory, it lets an interrupted run resume
/// without downloading the same tiles again.
pub struct Cache {
    cache_dir: PathBuf,
}

impl Cache {
    /// Create a new cache with the given directory
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)
                .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        }

        Ok(Self { cache_dir })
    }

    /// Returns the cached tile for the URL, if it was downloaded before
    pub fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let file_path = self.get_cache_path(url);
        if !file_path.exists() {
            return Ok(None);
        }
        let data = fs::read(&file_path)
            .with_context(|| format!("Failed to read cached tile {}", file_path.display()))?;
        Ok(Some(data))
    }

    /// Save a tile to the cache
    pub fn save_to_cache(&self, url: &str, data: &[u8]) -> Result<PathBuf> {
        let file_path = self.get_cache_path(url);

        // Write to a temporary name first so an interrupted write never looks cached
        let partial_path = file_path.with_extension("part");
        let mut file = File::create(&partial_path)
            .context("Failed to create cache file")?;
        file.write_all(data)
            .context("Failed to write data to cache file")?;
        fs::rename(&partial_path, &file_path)
            .context("Failed to move tile into the cache")?;

        Ok(file_path)
    }

    /// Get the cache path for a URL
    fn get_cache_path(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        let extension = url
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, extension)| extension)
            .filter(|extension| extension.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("");

        let file_name = if extension.is_empty() {
            hash
        } else {
            format!("{}.{}", hash, extension)
        };

        self.cache_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_get() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cache = Cache::new(dir.path().join("tiles")).expect("cache");
        let url = "https://tile.openstreetmap.org/12/2217/1387.png";

        assert_eq!(cache.get(url).expect("lookup"), None);
        let path = cache.save_to_cache(url, b"tile").expect("save");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
        assert_eq!(cache.get(url).expect("lookup"), Some(b"tile".to_vec()));
        assert_eq!(cache.get("https://tile.openstreetmap.org/12/2217/1388.png").expect("lookup"), None);
    }

    #[test]
    fn test_query_string_has_no_extension() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cache = Cache::new(dir.path()).expect("cache");
        let path = cache.save_to_cache("https://example.org/tile?x=1&y=2.5&z=3", b"tile").expect("save");
        assert_eq!(path.extension(), None);
    }
}
