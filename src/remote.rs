use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SiteConfig;
use crate::types::{DirEntry, DirListing, FileDetail};

const SEARCH_PAGE_SIZE: usize = 100;

/// Listing/search capability of the remote file store.
///
/// Timeouts and retries are the implementor's business; the catalog core calls
/// each method once.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// One page of a directory. `page_size == 0` asks for everything.
    async fn list_directory(&self, site: &str, path: &str, page: usize, page_size: usize) -> Result<DirListing>;
    async fn get_file(&self, site: &str, path: &str) -> Result<FileDetail>;
    async fn search(&self, site: &str, endpoint: &str, keyword: &str) -> Result<Vec<DirEntry>>;
    /// `None` when the file does not exist or has no content.
    async fn read_file_content(&self, site: &str, path: &str) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i32,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AlistObject {
    name: String,
    #[serde(default)]
    parent: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    is_dir: bool,
    #[serde(default)]
    modified: String,
    #[serde(default)]
    thumb: String,
    #[serde(default)]
    provider: String,
    #[serde(default)]
    raw_url: String,
}

#[derive(Debug, Deserialize)]
struct AlistContent {
    #[serde(default)]
    content: Option<Vec<AlistObject>>,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    provider: String,
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    path: &'a str,
    password: &'a str,
    page: usize,
    per_page: usize,
    refresh: bool,
}

#[derive(Debug, Serialize)]
struct GetRequest<'a> {
    path: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    parent: &'a str,
    keywords: &'a str,
    password: &'a str,
    page: usize,
    per_page: usize,
}

fn non_empty(s: String) -> Option<String> {
    Some(s).filter(|s| !s.is_empty())
}

impl AlistObject {
    fn into_entry(self, provider: Option<&str>) -> DirEntry {
        DirEntry {
            name: self.name,
            parent: self.parent,
            is_dir: self.is_dir,
            size: self.size,
            modified: self.modified,
            thumb: non_empty(self.thumb),
            provider: non_empty(self.provider).or_else(|| provider.map(str::to_string)),
            raw_url: non_empty(self.raw_url),
        }
    }
}

/// [`RemoteFs`] over the AList v3 HTTP API, one base URL per site.
pub struct AlistClient {
    http: reqwest::Client,
    sites: HashMap<String, SiteConfig>,
}

impl AlistClient {
    pub fn new(sites: &[SiteConfig]) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent("vodcat/0.1").build()?;
        let sites = sites.iter().map(|s| (s.name.clone(), s.clone())).collect();
        Ok(Self { http, sites })
    }

    fn site(&self, name: &str) -> Result<&SiteConfig> {
        self.sites.get(name).ok_or_else(|| anyhow!("unknown site {name}"))
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned + Send>(&self, site: &SiteConfig, endpoint: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", site.url.trim_end_matches('/'), endpoint);
        debug!("POST {}", url);
        let resp = self.http.post(&url).json(body).send().await.with_context(|| format!("request to {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("{url} returned HTTP {status}");
        }
        let env: Envelope<T> = resp.json().await.with_context(|| format!("decoding response from {url}"))?;
        if env.code != 200 {
            bail!("{url} failed with code {}: {}", env.code, env.message);
        }
        env.data.ok_or_else(|| anyhow!("{url} returned no data"))
    }
}

#[async_trait]
impl RemoteFs for AlistClient {
    async fn list_directory(&self, site: &str, path: &str, page: usize, page_size: usize) -> Result<DirListing> {
        let cfg = self.site(site)?;
        let req = ListRequest { path, password: cfg.password.as_deref().unwrap_or(""), page, per_page: page_size, refresh: false };
        let data: AlistContent = self.post(cfg, "/api/fs/list", &req).await?;
        let provider = non_empty(data.provider);
        let entries = data
            .content
            .unwrap_or_default()
            .into_iter()
            .map(|o| o.into_entry(provider.as_deref()))
            .collect();
        Ok(DirListing { entries, total: data.total })
    }

    async fn get_file(&self, site: &str, path: &str) -> Result<FileDetail> {
        let cfg = self.site(site)?;
        let req = GetRequest { path, password: cfg.password.as_deref().unwrap_or("") };
        let o: AlistObject = self.post(cfg, "/api/fs/get", &req).await?;
        Ok(FileDetail {
            name: o.name,
            is_dir: o.is_dir,
            modified: o.modified,
            thumb: non_empty(o.thumb),
            provider: non_empty(o.provider),
            raw_url: o.raw_url,
        })
    }

    async fn search(&self, site: &str, endpoint: &str, keyword: &str) -> Result<Vec<DirEntry>> {
        let cfg = self.site(site)?;
        let req = SearchRequest {
            parent: "/",
            keywords: keyword,
            password: cfg.password.as_deref().unwrap_or(""),
            page: 1,
            per_page: SEARCH_PAGE_SIZE,
        };
        let data: AlistContent = self.post(cfg, endpoint, &req).await?;
        Ok(data.content.unwrap_or_default().into_iter().map(|o| o.into_entry(None)).collect())
    }

    async fn read_file_content(&self, site: &str, path: &str) -> Result<Option<String>> {
        let detail = self.get_file(site, path).await?;
        if detail.raw_url.is_empty() {
            return Ok(None);
        }
        let url = crate::types::fix_http(&detail.raw_url);
        let resp = self.http.get(&url).send().await.with_context(|| format!("fetching {url}"))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status()?;
        let text = resp.text().await?;
        Ok(non_empty(text))
    }
}
