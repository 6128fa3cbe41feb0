use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{CatalogError, Result};

const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_PLAY_BASE_URL: &str = "http://localhost:4567/play";

/// One remote directory tree exposed as a catalog category.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SiteConfig {
    pub name: String,
    /// Base URL of the AList server backing this site.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub search_api: Option<String>,
    /// Local path or http(s) URL of a newline-delimited path index.
    #[serde(default)]
    pub index_file: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Overrides [`AppConfig::sort`] for this site.
    #[serde(default)]
    pub sort: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub page_size: usize,
    pub formats: BTreeSet<String>,
    /// Natural-sort playlists generated from folder listings.
    pub sort: bool,
    pub cache_dir: PathBuf,
    pub play_base_url: String,
    pub sites: Vec<SiteConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            formats: default_formats(),
            sort: true,
            cache_dir: default_cache_dir(),
            play_base_url: DEFAULT_PLAY_BASE_URL.to_string(),
            sites: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Resolve the config file: explicit path, then `VODCAT_CONFIG`, then the
    /// per-user config dir. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("VODCAT_CONFIG").map(PathBuf::from));
        let mut cfg = match explicit {
            Some(p) => Self::from_file(&p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        if let Some(size) = std::env::var("VODCAT_PAGE_SIZE").ok().and_then(|s| s.parse().ok()) {
            cfg.page_size = size;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text).map_err(|e| CatalogError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(CatalogError::Config("page_size must be positive".into()));
        }
        let mut seen = HashSet::new();
        for site in &self.sites {
            if site.name.is_empty() || site.name.contains('$') {
                return Err(CatalogError::Config(format!("invalid site name {:?}", site.name)));
            }
            if !seen.insert(site.name.as_str()) {
                return Err(CatalogError::Config(format!("duplicate site {}", site.name)));
            }
        }
        Ok(())
    }

    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.name == name)
    }

    pub fn sort_playlist(&self, site: &SiteConfig) -> bool {
        site.sort.unwrap_or(self.sort)
    }

    /// Extension allow-list test. Case-sensitive; a name without an
    /// extension (or a dotfile) is never media.
    pub fn is_media_format(&self, name: &str) -> bool {
        match name.rfind('.') {
            Some(idx) if idx > 0 => self.formats.contains(&name[idx + 1..]),
            _ => false,
        }
    }

    /// Like [`Self::is_media_format`] but for a slash-separated path.
    pub fn is_media_file(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.is_media_format(name)
    }
}

fn default_formats() -> BTreeSet<String> {
    [
        "mp4", "mkv", "avi", "rmvb", "rm", "wmv", "flv", "mov", "m4v", "ts", "m2ts", "mpg",
        "mpeg", "webm", "iso", "mp3", "flac", "m4a", "wav", "ape", "ogg",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "vodcat", "vodcat")
}

fn default_cache_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".cache"))
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}
