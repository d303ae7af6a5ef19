use super::api::{FetchError, PageSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Page bodies on disk, one file per URL, valid for `ttl` after writing.
///
/// Writes go through a temporary file and a rename, and each key has its own
/// lock, so concurrent readers never see a partial body and a key has at
/// most one writer at a time.
pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn key_for(url: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()).to_string()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.html", key))
    }

    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        locks.entry(key.to_string()).or_default().clone()
    }

    pub async fn read_fresh(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        let age = SystemTime::now()
            .duration_since(metadata.modified()?)
            .unwrap_or_default();

        if age >= self.ttl {
            debug!("Cache entry {} expired", key);
            return Ok(None);
        }

        tokio::fs::read_to_string(&path).await.map(Some)
    }

    pub async fn write(&self, key: &str, body: &str) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.path_for(key);
        let staging = self.dir.join(format!("{}.{}.tmp", key, Uuid::new_v4()));

        tokio::fs::write(&staging, body).await?;
        tokio::fs::rename(&staging, &target).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Read-through cache in front of another page source.
pub struct CachedSource<S> {
    inner: S,
    cache: DiskCache,
}

impl<S: PageSource> CachedSource<S> {
    pub fn new(inner: S, cache: DiskCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<S: PageSource> PageSource for CachedSource<S> {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let key = DiskCache::key_for(url);
        let lock = self.cache.lock_for(&key);
        let _guard = lock.lock().await;

        match self.cache.read_fresh(&key).await {
            Ok(Some(body)) => {
                debug!("Cache hit");
                return Ok(body);
            }
            Ok(None) => debug!("Cache miss"),
            Err(err) => warn!("Unreadable cache entry, fetching again: {}", err),
        }

        let body = self.inner.fetch(url).await?;

        if let Err(err) = self.cache.write(&key, &body).await {
            warn!("Couldn't store page in cache: {}", err);
        }

        Ok(body)
    }

    fn supports_concurrent_fetches(&self) -> bool {
        self.inner.supports_concurrent_fetches()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for CountingSource {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

            Ok(format!("{} #{}", url, call))
        }

        fn supports_concurrent_fetches(&self) -> bool {
            true
        }
    }

    fn counting() -> CountingSource {
        CountingSource {
            calls: AtomicUsize::new(0),
        }
    }

    #[test_log::test]
    fn should_derive_stable_keys_per_url() {
        assert_eq!(
            DiskCache::key_for("https://example.com/a"),
            DiskCache::key_for("https://example.com/a")
        );
        assert_ne!(
            DiskCache::key_for("https://example.com/a"),
            DiskCache::key_for("https://example.com/b")
        );
    }

    #[test_log::test(tokio::test)]
    async fn should_serve_fresh_entries_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source = CachedSource::new(
            counting(),
            DiskCache::new(dir.path(), Duration::from_secs(3600)),
        );

        let first = source.fetch("https://example.com/news").await.unwrap();
        let second = source.fetch("https://example.com/news").await.unwrap();

        assert_eq!(first, "https://example.com/news #1");
        assert_eq!(second, first);
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn when_entry_expired_should_fetch_again() {
        let dir = tempfile::tempdir().unwrap();
        let source = CachedSource::new(counting(), DiskCache::new(dir.path(), Duration::ZERO));

        source.fetch("https://example.com/news").await.unwrap();
        let second = source.fetch("https://example.com/news").await.unwrap();

        assert_eq!(second, "https://example.com/news #2");
    }

    #[test_log::test(tokio::test)]
    async fn should_fetch_each_url_once_under_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let source = CachedSource::new(
            counting(),
            DiskCache::new(dir.path(), Duration::from_secs(3600)),
        );

        let pages = futures::future::join_all(
            (0..8).map(|_| source.fetch("https://example.com/news")),
        )
        .await;

        assert!(pages.iter().all(|p| p.as_deref().ok() == Some("https://example.com/news #1")));
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
        assert!(source.supports_concurrent_fetches());
    }

    #[test_log::test(tokio::test)]
    async fn should_leave_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), Duration::from_secs(3600));

        cache.write("key", "<html></html>").await.unwrap();

        let names = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["key.html".to_string()]);
        assert_eq!(
            cache.read_fresh("key").await.unwrap().as_deref(),
            Some("<html></html>")
        );
    }
}
