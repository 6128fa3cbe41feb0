use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{AppConfig, SiteConfig};
use crate::error::{CatalogError, Result};
use crate::index_cache::IndexCache;
use crate::pool::TaskPool;
use crate::remote::RemoteFs;
use crate::types::{fix_path, CatalogEntry, CatalogPage, EntryKind, PLAYLIST};

pub const DEFAULT_SEARCH_API: &str = "/api/fs/search";

/// How one site answers keyword searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Grep a newline-delimited path index (local path or URL).
    IndexFile(String),
    /// Ask the remote search endpoint.
    Api(String),
}

impl SearchStrategy {
    pub fn for_site(site: &SiteConfig) -> Option<Self> {
        if !site.searchable {
            return None;
        }
        match site.index_file.as_deref().map(str::trim) {
            Some(idx) if !idx.is_empty() => Some(Self::IndexFile(idx.to_string())),
            _ => Some(Self::Api(site.search_api.clone().unwrap_or_else(|| DEFAULT_SEARCH_API.to_string()))),
        }
    }
}

/// Required substrings: every token must occur in a candidate, case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keywords(Vec<String>);

impl Keywords {
    pub fn parse(keyword: &str) -> Self {
        let mut tokens: Vec<String> = Vec::new();
        for t in keyword.split_whitespace() {
            if !tokens.iter().any(|x| x == t) {
                tokens.push(t.to_string());
            }
        }
        Self(tokens)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.0.iter().all(|t| candidate.contains(t.as_str()))
    }
}

pub struct SearchEngine {
    config: Arc<AppConfig>,
    remote: Arc<dyn RemoteFs>,
    index: Arc<IndexCache>,
    pool: TaskPool,
}

impl SearchEngine {
    pub fn new(config: Arc<AppConfig>, remote: Arc<dyn RemoteFs>, index: Arc<IndexCache>, pool: TaskPool) -> Self {
        Self { config, remote, index, pool }
    }

    /// Search every searchable site concurrently. A failing site contributes
    /// nothing; results are concatenated in site declaration order.
    pub async fn search(&self, keyword: &str) -> CatalogPage {
        let keywords = Arc::new(Keywords::parse(keyword));
        if keywords.is_empty() {
            return CatalogPage::single(Vec::new());
        }

        let mut tasks = Vec::new();
        for site in &self.config.sites {
            let Some(strategy) = SearchStrategy::for_site(site) else { continue };
            let name = site.name.clone();
            let (config, remote, index, keywords) =
                (self.config.clone(), self.remote.clone(), self.index.clone(), keywords.clone());
            let raw = keyword.to_string();
            let handle = self.pool.spawn(async move {
                match strategy {
                    SearchStrategy::IndexFile(loc) => search_by_file(&config, &index, &name, &keywords, &loc).await,
                    SearchStrategy::Api(api) => search_by_api(&config, remote.as_ref(), &name, &api, &raw).await,
                }
            });
            tasks.push((site.name.clone(), handle));
        }

        let mut list = Vec::new();
        for (site, handle) in tasks {
            match handle.await {
                Ok(Ok(mut found)) => list.append(&mut found),
                Ok(Err(e)) => warn!("search on site {} failed: {}", site, e),
                Err(e) => warn!("search task for site {} aborted: {}", site, e),
            }
        }
        info!("search \"{}\" result: {}", keyword, list.len());
        CatalogPage::single(list)
    }
}

fn classify(config: &AppConfig, site: &str, path: &str, name: &str) -> CatalogEntry {
    let media = config.is_media_file(path);
    let suffix = if media { "" } else { PLAYLIST };
    let id = format!("{}${}", site, fix_path(&format!("{path}{suffix}")));
    CatalogEntry::new(id, name, if media { EntryKind::File } else { EntryKind::Folder })
}

async fn search_by_file(config: &AppConfig, index: &IndexCache, site: &str, keywords: &Keywords, location: &str) -> Result<Vec<CatalogEntry>> {
    let path = index.resolve(site, location).await?;
    info!("search {:?} from site {}, index: {}", keywords, site, path.display());
    let text = tokio::fs::read_to_string(&path).await.map_err(|e| CatalogError::index(site, format!("{}: {e}", path.display())))?;
    let list: Vec<CatalogEntry> = text
        .lines()
        .filter(|line| !line.is_empty() && keywords.matches(line))
        .map(|line| classify(config, site, &format!("/{line}"), line))
        .collect();
    debug!("search from site {}, result: {}", site, list.len());
    Ok(list)
}

async fn search_by_api(config: &AppConfig, remote: &dyn RemoteFs, site: &str, api: &str, keyword: &str) -> Result<Vec<CatalogEntry>> {
    info!("search \"{}\" from site {}, api: {}", keyword, site, api);
    let found = remote.search(site, api, keyword).await.map_err(CatalogError::RemoteUnavailable)?;
    Ok(found
        .iter()
        .map(|e| classify(config, site, &format!("{}/{}", e.parent, e.name), &e.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use async_trait::async_trait;

    use super::*;
    use crate::index_cache::Downloader;
    use crate::remote::mock::{folder, media, MockFs};
    use crate::types::DirEntry;

    struct Offline;

    #[async_trait]
    impl Downloader for Offline {
        async fn download(&self, url: &str, _dest: &Path) -> anyhow::Result<()> {
            anyhow::bail!("cannot reach {url}")
        }
    }

    fn site(name: &str, index_file: Option<&str>) -> SiteConfig {
        SiteConfig { name: name.into(), searchable: true, index_file: index_file.map(String::from), ..Default::default() }
    }

    fn engine(sites: Vec<SiteConfig>, remote: MockFs, cache_root: &Path) -> SearchEngine {
        let config = Arc::new(AppConfig { sites, ..Default::default() });
        let index = Arc::new(IndexCache::new(cache_root, Arc::new(Offline)));
        SearchEngine::new(config, Arc::new(remote), index, TaskPool::new(2))
    }

    fn in_parent(mut e: DirEntry, parent: &str) -> DirEntry {
        e.parent = parent.to_string();
        e
    }

    #[test]
    fn keywords_require_every_token() {
        let k = Keywords::parse("  Star   Wars Star ");
        assert!(k.matches("/movies/Star Wars IV.mkv"));
        assert!(!k.matches("/movies/Star Trek.mkv"));
        assert!(!k.matches("/movies/star wars.mkv"));
        assert!(Keywords::parse("   ").is_empty());
    }

    #[test]
    fn strategy_prefers_index_file() {
        assert_eq!(SearchStrategy::for_site(&site("a", Some("/i.txt"))), Some(SearchStrategy::IndexFile("/i.txt".into())));
        assert_eq!(SearchStrategy::for_site(&site("a", Some("  "))), Some(SearchStrategy::Api(DEFAULT_SEARCH_API.into())));
        let mut off = site("a", None);
        off.searchable = false;
        assert_eq!(SearchStrategy::for_site(&off), None);
    }

    #[tokio::test]
    async fn failing_source_is_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let local = tmp.path().join("local.txt");
        std::fs::write(&local, "anime/Naruto/ep1.mp4\nanime/Naruto\nanime/Bleach/ep1.mp4\n").unwrap();
        let remote = MockFs::default().search_hits(
            "api",
            vec![in_parent(media("Naruto 01.mkv", 1), "/tv//naruto"), in_parent(folder("Naruto OVA"), "/tv")],
        );
        let sites = vec![
            site("file", local.to_str()),
            site("broken", Some("https://unreachable.example/index.zip")),
            site("api", None),
        ];
        let engine = engine(sites, remote, &tmp.path().join("cache"));

        let page = engine.search("Naruto").await;
        let ids: Vec<&str> = page.list.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "file$/anime/Naruto/ep1.mp4",
                "file$/anime/Naruto/~playlist",
                "api$/tv/naruto/Naruto 01.mkv",
                "api$/tv/Naruto OVA/~playlist",
            ]
        );
        assert_eq!(page.total, 4);
        assert_eq!(page.list[0].tag, EntryKind::File);
        assert_eq!(page.list[1].tag, EntryKind::Folder);
        assert_eq!(page.list[1].name, "anime/Naruto");
    }

    #[tokio::test]
    async fn remote_failure_yields_empty_contribution() {
        let tmp = tempfile::tempdir().unwrap();
        let remote = MockFs::default().fail("api");
        let engine = engine(vec![site("api", None)], remote, tmp.path());
        let page = engine.search("anything").await;
        assert!(page.list.is_empty());
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn non_searchable_sites_are_not_queried() {
        let tmp = tempfile::tempdir().unwrap();
        let remote = Arc::new(MockFs::default());
        let mut quiet = site("quiet", None);
        quiet.searchable = false;
        let config = Arc::new(AppConfig { sites: vec![quiet], ..Default::default() });
        let index = Arc::new(IndexCache::new(tmp.path(), Arc::new(Offline)));
        let engine = SearchEngine::new(config, remote.clone(), index, TaskPool::new(1));
        engine.search("x").await;
        assert!(remote.calls().is_empty());
    }
}
