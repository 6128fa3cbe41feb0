pub mod catalog;
pub mod config;
pub mod detail;
pub mod error;
pub mod index_cache;
pub mod natural;
pub mod playlist;
pub mod pool;
pub mod remote;
pub mod search;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::config::{AppConfig, SiteConfig};
    pub use crate::error::CatalogError;
    pub use crate::remote::RemoteFs;
    pub use crate::types::{CatalogEntry, CatalogId, CatalogPage, CategoryList, DirEntry, EntryKind, FileDetail};
    pub use crate::Vodcat;
}

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::catalog::CatalogBuilder;
use crate::config::AppConfig;
use crate::error::CatalogError;
use crate::index_cache::{is_remote, Downloader, HttpDownloader, IndexCache};
use crate::pool::TaskPool;
use crate::remote::{AlistClient, RemoteFs};
use crate::search::{SearchEngine, SearchStrategy};
use crate::types::{CatalogId, CatalogPage, Category, CategoryList, Filter, FilterValue};

const SORT_FILTERS: [(&str, &str); 7] = [
    ("原始顺序", ""),
    ("名字⬆️", "name,asc"),
    ("名字⬇️", "name,desc"),
    ("时间⬆️", "time,asc"),
    ("时间⬇️", "time,desc"),
    ("大小⬆️", "size,asc"),
    ("大小⬇️", "size,desc"),
];

/// Async library entry point. Owns the remote client, the index cache and
/// the search worker pool; drop it to release them.
pub struct Vodcat {
    config: Arc<AppConfig>,
    catalog: CatalogBuilder,
    search: SearchEngine,
    index: Arc<IndexCache>,
}

impl Vodcat {
    /// Wire up the AList client, HTTP index downloader and a pool sized to
    /// the machine.
    pub fn new(config: AppConfig) -> Result<Self> {
        let remote = Arc::new(AlistClient::new(&config.sites)?);
        let downloader = Arc::new(HttpDownloader::new()?);
        Ok(Self::with_parts(config, remote, downloader, TaskPool::with_available_parallelism()))
    }

    pub fn with_parts(config: AppConfig, remote: Arc<dyn RemoteFs>, downloader: Arc<dyn Downloader>, pool: TaskPool) -> Self {
        let config = Arc::new(config);
        let index = Arc::new(IndexCache::new(config.cache_dir.clone(), downloader));
        let catalog = CatalogBuilder::new(config.clone(), remote.clone());
        let search = SearchEngine::new(config.clone(), remote, index.clone(), pool);
        Self { config, catalog, search, index }
    }

    pub fn config(&self) -> &AppConfig { &self.config }

    /// One category per site, each offering the sort filter.
    pub fn categories(&self) -> CategoryList {
        let filters = vec![Filter {
            key: "sort".to_string(),
            name: "排序".to_string(),
            value: SORT_FILTERS.iter().map(|(n, v)| FilterValue { n: n.to_string(), v: v.to_string() }).collect(),
        }];
        let list: Vec<Category> = self
            .config
            .sites
            .iter()
            .map(|s| Category { type_id: format!("{}$/", s.name), type_name: s.name.clone(), filters: filters.clone() })
            .collect();
        let n = list.len();
        CategoryList { list, total: n, limit: n }
    }

    pub async fn search(&self, keyword: &str) -> CatalogPage { self.search.search(keyword).await }

    /// Browse the folder named by `id` (`site$path`).
    pub async fn list(&self, id: &str, sort: Option<&str>, page: usize) -> Result<CatalogPage, CatalogError> {
        let id: CatalogId = id.parse()?;
        self.catalog.build_page(&id.site, &id.path, sort, page).await
    }

    pub async fn detail(&self, id: &str) -> Result<CatalogPage, CatalogError> {
        let id: CatalogId = id.parse()?;
        self.catalog.detail(&id).await
    }

    pub async fn play_url(&self, site: &str, path: &str) -> Result<String, CatalogError> {
        self.catalog.play_url(site, path).await
    }

    /// Fetch every searchable site's remote index up front. Returns how many
    /// are available locally; failures are logged and left for the next
    /// search to retry.
    pub async fn warm_index_cache(&self) -> usize {
        let mut ready = 0;
        for site in &self.config.sites {
            let Some(SearchStrategy::IndexFile(loc)) = SearchStrategy::for_site(site) else { continue };
            if !is_remote(&loc) {
                continue;
            }
            match self.index.resolve(&site.name, &loc).await {
                Ok(path) => {
                    info!("index for site {} at {}", site.name, path.display());
                    ready += 1;
                }
                Err(e) => warn!("{}", e),
            }
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::config::SiteConfig;
    use crate::remote::mock::{media, MockFs};

    #[derive(Default)]
    struct CountingDownloader(AtomicUsize);

    #[async_trait]
    impl Downloader for CountingDownloader {
        async fn download(&self, _url: &str, dest: &Path) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, "shows/Bleach/ep1.mkv\n").await?;
            Ok(())
        }
    }

    fn app(cache: &Path, remote: MockFs, downloader: Arc<CountingDownloader>) -> Vodcat {
        let config = AppConfig {
            cache_dir: cache.to_path_buf(),
            sites: vec![
                SiteConfig { name: "a".into(), searchable: true, index_file: Some("https://h/a/index.txt".into()), ..Default::default() },
                SiteConfig { name: "b".into(), ..Default::default() },
            ],
            ..Default::default()
        };
        Vodcat::with_parts(config, Arc::new(remote), downloader, TaskPool::new(2))
    }

    #[tokio::test]
    async fn categories_offer_sort_filters() {
        let tmp = tempfile::tempdir().unwrap();
        let cats = app(tmp.path(), MockFs::default(), Arc::default()).categories();
        assert_eq!(cats.total, 2);
        assert_eq!(cats.list[0].type_id, "a$/");
        assert_eq!(cats.list[1].type_name, "b");
        assert_eq!(cats.list[0].filters[0].value.len(), 7);
        assert_eq!(cats.list[0].filters[0].value[1].v, "name,asc");
    }

    #[tokio::test]
    async fn warm_then_search_downloads_once() {
        let tmp = tempfile::tempdir().unwrap();
        let downloader = Arc::new(CountingDownloader::default());
        let app = app(tmp.path(), MockFs::default(), downloader.clone());
        assert_eq!(app.warm_index_cache().await, 1);
        let page = app.search("Bleach").await;
        assert_eq!(page.list.len(), 1);
        assert_eq!(page.list[0].id, "a$/shows/Bleach/ep1.mkv");
        assert_eq!(downloader.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn list_parses_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let remote = MockFs::default().dir("b", "/x", vec![media("1.mp4", 1)]);
        let app = app(tmp.path(), remote, Arc::default());
        let page = app.list("b$/x", None, 1).await.unwrap();
        assert_eq!(page.list[0].id, "b$/x/1.mp4");
        assert!(matches!(app.list("garbage", None, 1).await, Err(CatalogError::InvalidId(_))));
    }
}
