use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::playlist::parse_ordinal;

/// Path suffix identifying a playlist generated from a folder's media files.
pub const PLAYLIST: &str = "/~playlist";
/// User-authored playlist file name.
pub const PLAYLIST_TXT: &str = "playlist.txt";
pub const FOLDER_PIC: &str = "http://img1.3png.com/281e284a670865a71d91515866552b5f172b.png";
pub const LIST_PIC: &str = "http://img1.3png.com/3063ad894f04619af7270df68a124f129c8f.png";

/// One item of a remote listing or search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    /// Parent directory; only populated by search results.
    #[serde(default)]
    pub parent: String,
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: String,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub raw_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirListing {
    pub entries: Vec<DirEntry>,
    pub total: usize,
}

/// Single-file metadata as returned by the remote `get` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileDetail {
    pub name: String,
    pub is_dir: bool,
    #[serde(default)]
    pub modified: String,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub raw_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// `site$path` with an optional `#index` suffix selecting one group of a
/// `playlist.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogId {
    pub site: String,
    pub path: String,
    pub index: Option<usize>,
}

impl CatalogId {
    pub fn new(site: impl Into<String>, path: impl Into<String>) -> Self {
        Self { site: site.into(), path: fix_path(&path.into()), index: None }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Path including the `#index` suffix, as the remote-facing playlist
    /// views expect it.
    pub fn full_path(&self) -> String {
        match self.index {
            Some(i) => format!("{}#{}", self.path, i),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}${}", self.site, self.full_path())
    }
}

impl FromStr for CatalogId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (site, rest) = s.split_once('$').ok_or_else(|| CatalogError::InvalidId(s.to_string()))?;
        if site.is_empty() {
            return Err(CatalogError::InvalidId(s.to_string()));
        }
        if let Some((path, _)) = rest.rsplit_once('#') {
            if path.ends_with(PLAYLIST_TXT) {
                if let Some(index) = parse_ordinal(rest) {
                    return Ok(Self { site: site.to_string(), path: path.to_string(), index: Some(index) });
                }
            }
        }
        Ok(Self { site: site.to_string(), path: rest.to_string(), index: None })
    }
}

/// The unit handed to the client. Detail-only fields stay `None` in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub tag: EntryKind,
    pub pic: String,
    pub remarks: String,
    pub time: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_from: Option<String>,
    /// `label$url` pairs joined by `#`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_url: Option<String>,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tag: EntryKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tag,
            pic: String::new(),
            remarks: String::new(),
            time: String::new(),
            size: 0,
            type_name: None,
            actor: None,
            director: None,
            lang: None,
            area: None,
            year: None,
            content: None,
            play_from: None,
            play_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub list: Vec<CatalogEntry>,
    pub page: usize,
    pub total: usize,
    pub limit: usize,
    pub page_count: usize,
}

impl CatalogPage {
    pub fn new(list: Vec<CatalogEntry>, page: usize, total: usize, limit: usize) -> Self {
        let page_count = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self { list, page, total, limit, page_count }
    }

    /// A page holding everything at once (search results, detail views).
    pub fn single(list: Vec<CatalogEntry>) -> Self {
        let n = list.len();
        Self::new(list, 1, n, n)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterValue {
    pub n: String,
    pub v: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub key: String,
    pub name: String,
    pub value: Vec<FilterValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub type_id: String,
    pub type_name: String,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryList {
    pub list: Vec<Category>,
    pub total: usize,
    pub limit: usize,
}

/// Collapse runs of `/` into one.
pub fn fix_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !last_slash {
                out.push(ch);
            }
            last_slash = true;
        } else {
            out.push(ch);
            last_slash = false;
        }
    }
    out
}

/// Rewrite protocol-relative URLs to explicit `http:`.
pub fn fix_http(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("http://{rest}"),
        None => url.to_string(),
    }
}

/// Parent directory of a slash path; a root-level path is returned as is.
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) if idx > 0 => &path[..idx],
        _ => path,
    }
}

/// File name without its extension.
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
