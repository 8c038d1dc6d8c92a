//! Filesystem artifact cache
//!
//! One PNG per capture key, with the capture timestamp carried as the file's
//! modification time. Writes go to a temp file first and are renamed into
//! place, so a concurrent reader sees either the old artifact or the new one,
//! never a partial write.

use crate::utils::sanitize_filename;
use crate::ScreenshotError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

/// Filesystem-safe identifier for a capture target.
///
/// Keyed by host: two pages on the same host share one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaptureKey(String);

impl CaptureKey {
    pub fn from_url(url: &Url) -> Result<Self, ScreenshotError> {
        let host = url
            .host_str()
            .ok_or_else(|| ScreenshotError::InvalidUrl(url.to_string()))?;
        Ok(Self(sanitize_filename(host)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A complete artifact read back from the cache.
#[derive(Debug, Clone)]
pub struct CachedArtifact {
    pub bytes: Vec<u8>,
    pub captured_at: SystemTime,
}

impl CachedArtifact {
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.captured_at)
            .unwrap_or_default()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Key-value store for captured artifacts, backed by a single directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open the store, creating the backing directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ScreenshotError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, key: &CaptureKey) -> PathBuf {
        self.root.join(format!("{}.png", key.as_str()))
    }

    /// Look up the artifact for a key. A missing key is not an error.
    pub async fn get(&self, key: &CaptureKey) -> Result<Option<CachedArtifact>, ScreenshotError> {
        let path = self.artifact_path(key);

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let captured_at = metadata.modified()?;
        let bytes = fs::read(&path).await?;

        Ok(Some(CachedArtifact { bytes, captured_at }))
    }

    /// Atomically publish a new artifact, replacing any previous one.
    pub async fn put(&self, key: &CaptureKey, bytes: &[u8]) -> Result<(), ScreenshotError> {
        let path = self.artifact_path(key);
        let tmp = self.root.join(format!(
            ".{}.{}.tmp",
            key.as_str(),
            uuid::Uuid::new_v4().simple()
        ));

        if let Err(err) = write_file(&tmp, bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err);
        }
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        debug!(%key, bytes = bytes.len(), "artifact published");
        Ok(())
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ScreenshotError> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (CacheStore, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(temp_dir.path()).await.unwrap();
        (store, temp_dir)
    }

    fn key(name: &str) -> CaptureKey {
        CaptureKey::from_url(&Url::parse(&format!("https://{name}")).unwrap()).unwrap()
    }

    #[test]
    fn test_capture_key_from_url() {
        let url = Url::parse("https://example.com/some/page?q=1").unwrap();
        assert_eq!(CaptureKey::from_url(&url).unwrap().as_str(), "example.com");

        let url = Url::parse("https://sub.example.com").unwrap();
        assert_eq!(
            CaptureKey::from_url(&url).unwrap().as_str(),
            "sub.example.com"
        );

        // Same host, different paths -> same key
        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("https://example.com/b").unwrap();
        assert_eq!(
            CaptureKey::from_url(&a).unwrap(),
            CaptureKey::from_url(&b).unwrap()
        );
    }

    #[test]
    fn test_artifact_freshness() {
        let ttl = Duration::from_secs(24 * 60 * 60);

        let fresh = CachedArtifact {
            bytes: vec![1],
            captured_at: SystemTime::now() - Duration::from_secs(24 * 60 * 60 - 60),
        };
        assert!(fresh.is_fresh(ttl));

        let stale = CachedArtifact {
            bytes: vec![1],
            captured_at: SystemTime::now() - Duration::from_secs(24 * 60 * 60 + 60),
        };
        assert!(!stale.is_fresh(ttl));
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let (store, _temp_dir) = create_test_store().await;
        let artifact = store.get(&key("missing.example")).await.unwrap();
        assert!(artifact.is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let (store, _temp_dir) = create_test_store().await;
        let key = key("example.com");
        let bytes = b"fake png bytes".to_vec();

        store.put(&key, &bytes).await.unwrap();
        let artifact = store.get(&key).await.unwrap().unwrap();

        assert_eq!(artifact.bytes, bytes);
        assert!(artifact.age() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_put_overwrites_and_leaves_no_temp_files() {
        let (store, temp_dir) = create_test_store().await;
        let key = key("example.com");

        store.put(&key, b"first").await.unwrap();
        store.put(&key, b"second").await.unwrap();

        let artifact = store.get(&key).await.unwrap().unwrap();
        assert_eq!(artifact.bytes, b"second");

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["example.com.png".to_string()]);
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        let first = CacheStore::open(&nested).await.unwrap();
        let second = CacheStore::open(&nested).await.unwrap();
        assert_eq!(first.root(), second.root());
    }
}
