//! Local copies of remote search indexes, fetched once per site and kept
//! forever. Index files are treated as immutable once published.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use zip::ZipArchive;

use crate::error::{CatalogError, Result};

const DEFAULT_INDEX_NAME: &str = "index.txt";

/// Fetches a URL into a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> anyhow::Result<()>;
}

pub struct HttpDownloader {
    http: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().user_agent("vodcat/0.1").build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        let resp = self.http.get(url).send().await?.error_for_status()?;
        let mut out = tokio::fs::File::create(dest).await?;
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            out.write_all(&chunk?).await?;
        }
        out.flush().await?;
        Ok(())
    }
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Last path segment of a URL, or `index.txt` when there is none.
fn url_file_name(url: &str) -> String {
    let last = match url::Url::parse(url) {
        Ok(u) => u.path_segments().and_then(|mut s| s.next_back()).map(str::to_string),
        Err(_) => url.rsplit('/').next().map(str::to_string),
    };
    last.filter(|s| !s.is_empty()).unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string())
}

pub struct IndexCache {
    root: PathBuf,
    downloader: Arc<dyn Downloader>,
}

impl IndexCache {
    pub fn new(root: impl Into<PathBuf>, downloader: Arc<dyn Downloader>) -> Self {
        Self { root: root.into(), downloader }
    }

    /// Where a remote index for `site` lives once cached.
    pub fn cache_path(&self, site: &str, url: &str) -> PathBuf {
        let name = url_file_name(url);
        let file = match name.strip_suffix(".zip") {
            Some(stem) => format!("{stem}.txt"),
            None => name,
        };
        self.root.join(site).join(file)
    }

    /// Local readable path for `location`. Local paths pass through; remote
    /// ones are downloaded (and unzipped) on first use only.
    pub async fn resolve(&self, site: &str, location: &str) -> Result<PathBuf> {
        if !is_remote(location) {
            return Ok(PathBuf::from(location));
        }
        let target = self.cache_path(site, location);
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Ok(target);
        }
        let dir = self.root.join(site);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| CatalogError::index(site, e))?;

        info!("download index file from {}", location);
        let name = url_file_name(location);
        if name.ends_with(".zip") {
            let archive = dir.join(&name);
            self.fetch(site, location, &archive).await?;
            let (src, dest) = (archive.clone(), dir.clone());
            let extracted = tokio::task::spawn_blocking(move || extract_zip(&src, &dest))
                .await
                .map_err(|e| CatalogError::archive(&archive, e))?;
            let _ = tokio::fs::remove_file(&archive).await;
            extracted?;
            if !target.is_file() {
                return Err(CatalogError::archive(&archive, format!("{} missing after extraction", target.display())));
            }
        } else {
            let part = target.with_extension("part");
            self.fetch(site, location, &part).await?;
            tokio::fs::rename(&part, &target).await.map_err(|e| CatalogError::index(site, e))?;
        }
        Ok(target)
    }

    async fn fetch(&self, site: &str, url: &str, dest: &Path) -> Result<()> {
        if let Err(e) = self.downloader.download(url, dest).await {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(CatalogError::index(site, format!("{url}: {e:#}")));
        }
        Ok(())
    }
}

/// Unpack `archive` into `dest`. Entries that would land outside `dest` are
/// skipped. Returns the number of files written.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive).map_err(|e| CatalogError::archive(archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| CatalogError::archive(archive, e))?;
    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| CatalogError::archive(archive, e))?;
        let Some(rel) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!("skipping unsafe zip entry {}", entry.name());
            continue;
        };
        let out = dest.join(rel);
        let io_err = |e: std::io::Error| CatalogError::archive(archive, e);
        if entry.is_dir() {
            std::fs::create_dir_all(&out).map_err(io_err)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut f = File::create(&out).map_err(io_err)?;
        std::io::copy(&mut entry, &mut f).map_err(io_err)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FakeDownloader {
        body: Vec<u8>,
        fail: bool,
        hits: AtomicUsize,
    }

    impl FakeDownloader {
        fn serving(body: Vec<u8>) -> Arc<Self> {
            Arc::new(Self { body, fail: false, hits: AtomicUsize::new(0) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { body: Vec::new(), fail: true, hits: AtomicUsize::new(0) })
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn download(&self, _url: &str, dest: &Path) -> anyhow::Result<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            tokio::fs::write(dest, &self.body).await?;
            Ok(())
        }
    }

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut w = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default();
        for (name, body) in entries {
            w.start_file(*name, options).unwrap();
            w.write_all(body.as_bytes()).unwrap();
        }
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn cache_path_swaps_zip_suffix() {
        let cache = IndexCache::new("/c", FakeDownloader::failing());
        assert_eq!(cache.cache_path("s", "http://h/a/index.zip"), PathBuf::from("/c/s/index.txt"));
        assert_eq!(cache.cache_path("s", "http://h/a/all.txt"), PathBuf::from("/c/s/all.txt"));
        assert_eq!(cache.cache_path("s", "http://h/"), PathBuf::from("/c/s/index.txt"));
    }

    #[tokio::test]
    async fn local_paths_pass_through() {
        let fake = FakeDownloader::failing();
        let cache = IndexCache::new("/c", fake.clone());
        let p = cache.resolve("s", "/data/index.txt").await.unwrap();
        assert_eq!(p, PathBuf::from("/data/index.txt"));
        assert_eq!(fake.hits(), 0);
    }

    #[tokio::test]
    async fn second_resolve_is_a_cache_hit() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = FakeDownloader::serving(b"movies/a.mp4\n".to_vec());
        let cache = IndexCache::new(tmp.path(), fake.clone());
        let first = cache.resolve("s", "https://h/idx/index.txt").await.unwrap();
        let second = cache.resolve("s", "https://h/idx/index.txt").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fake.hits(), 1);
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "movies/a.mp4\n");
    }

    #[tokio::test]
    async fn zip_index_is_extracted_and_archive_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let body = zip_bytes(&[("index.txt", "a/b.mkv\n"), ("../evil.txt", "x")]);
        let fake = FakeDownloader::serving(body);
        let cache = IndexCache::new(tmp.path().join("cache"), fake.clone());
        let path = cache.resolve("s", "https://h/index.zip").await.unwrap();
        assert_eq!(path, tmp.path().join("cache/s/index.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a/b.mkv\n");
        assert!(!tmp.path().join("cache/s/index.zip").exists());
        assert!(!tmp.path().join("cache/evil.txt").exists());
        cache.resolve("s", "https://h/index.zip").await.unwrap();
        assert_eq!(fake.hits(), 1);
    }

    #[tokio::test]
    async fn zip_without_expected_text_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = FakeDownloader::serving(zip_bytes(&[("other.txt", "x")]));
        let cache = IndexCache::new(tmp.path(), fake);
        let err = cache.resolve("s", "https://h/index.zip").await.unwrap_err();
        assert!(matches!(err, CatalogError::CorruptArchive { .. }));
    }

    #[tokio::test]
    async fn garbage_archive_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let fake = FakeDownloader::serving(b"not a zip".to_vec());
        let cache = IndexCache::new(tmp.path(), fake);
        let err = cache.resolve("s", "https://h/index.zip").await.unwrap_err();
        assert!(matches!(err, CatalogError::CorruptArchive { .. }));
    }

    #[tokio::test]
    async fn download_failure_is_index_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = IndexCache::new(tmp.path(), FakeDownloader::failing());
        let err = cache.resolve("s", "https://h/index.txt").await.unwrap_err();
        assert!(matches!(err, CatalogError::IndexUnavailable { ref site, .. } if site == "s"));
        assert!(!cache.cache_path("s", "https://h/index.txt").exists());
    }
}
