use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::config::{AppConfig, SiteConfig};
use crate::error::{CatalogError, Result};
use crate::natural;
use crate::playlist::{episode_remark, parse_groups, PLAYLIST_NAME};
use crate::remote::RemoteFs;
use crate::types::{fix_path, CatalogEntry, CatalogId, CatalogPage, DirEntry, EntryKind, FOLDER_PIC, LIST_PIC, PLAYLIST, PLAYLIST_TXT};

const FOLDER_REMARK: &str = "文件夹";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Time,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// `name|time|size` x `asc|desc`, written `field,order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for SortKey {
    fn default() -> Self {
        Self { field: SortField::Name, order: SortOrder::Asc }
    }
}

impl FromStr for SortKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        let (field, order) = s.split_once(',').ok_or_else(|| CatalogError::UnrecognizedSort(s.to_string()))?;
        let field = match field {
            "name" => SortField::Name,
            "time" => SortField::Time,
            "size" => SortField::Size,
            _ => return Err(CatalogError::UnrecognizedSort(s.to_string())),
        };
        let order = match order {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => return Err(CatalogError::UnrecognizedSort(s.to_string())),
        };
        Ok(Self { field, order })
    }
}

impl SortKey {
    /// Absent means the default; anything unrecognized means keep the
    /// order the remote returned (`None`).
    pub fn resolve(raw: Option<&str>) -> Option<Self> {
        let Some(raw) = raw else { return Some(Self::default()) };
        match raw.parse() {
            Ok(key) => Some(key),
            Err(e) => {
                debug!("{}, keeping remote order", e);
                None
            }
        }
    }

    pub fn compare(&self, a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
        let ord = match self.field {
            SortField::Name => natural::compare(&a.name, &b.name),
            SortField::Time => time_key(&a.time).cmp(&time_key(&b.time)).then_with(|| a.time.cmp(&b.time)),
            SortField::Size => a.size.cmp(&b.size),
        };
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }

    pub fn sort(&self, entries: &mut [CatalogEntry]) {
        entries.sort_by(|a, b| self.compare(a, b));
    }
}

fn time_key(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok()
}

/// Human-readable size using 1024-based units; zero renders empty.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(&str, f64); 3] = [
        ("TB", 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("GB", 1024.0 * 1024.0 * 1024.0),
        ("MB", 1024.0 * 1024.0),
    ];
    if bytes == 0 {
        return String::new();
    }
    let value = bytes as f64;
    for (unit, threshold) in UNITS {
        if value >= threshold {
            return format!("{:.2}{}", value / threshold, unit);
        }
    }
    format!("{:.2}KB", value / 1024.0)
}

pub(crate) fn cover(thumb: Option<&str>, is_dir: bool) -> String {
    match thumb {
        Some(t) if !t.is_empty() => t.to_string(),
        _ if is_dir => FOLDER_PIC.to_string(),
        _ => String::new(),
    }
}

/// Browses remote folders into catalog pages and serves the detail views.
pub struct CatalogBuilder {
    pub(crate) config: Arc<AppConfig>,
    pub(crate) remote: Arc<dyn RemoteFs>,
}

impl CatalogBuilder {
    pub fn new(config: Arc<AppConfig>, remote: Arc<dyn RemoteFs>) -> Self {
        Self { config, remote }
    }

    pub(crate) fn site(&self, name: &str) -> Result<&SiteConfig> {
        self.config.site(name).ok_or_else(|| CatalogError::UnknownSite(name.to_string()))
    }

    /// One page of `path`: folders, then playlists, then media files.
    pub async fn build_page(&self, site: &str, path: &str, sort: Option<&str>, page: usize) -> Result<CatalogPage> {
        self.site(site)?;
        let size = self.config.page_size;
        let page = page.max(1);
        let listing = self
            .remote
            .list_directory(site, path, page, size)
            .await
            .map_err(CatalogError::RemoteUnavailable)?;
        let mut total = listing.total;

        let mut folders = Vec::new();
        let mut files = Vec::new();
        let mut playlists = Vec::new();
        for entry in &listing.entries {
            if !entry.is_dir && entry.name == PLAYLIST_TXT {
                let marker = fix_path(&format!("{path}/{PLAYLIST_TXT}"));
                playlists = self.playlist_summaries(site, &marker).await?;
                total = total.saturating_sub(1);
                continue;
            }
            if !entry.is_dir && !self.config.is_media_format(&entry.name) {
                total = total.saturating_sub(1);
                continue;
            }
            let item = self.to_entry(site, path, entry);
            if entry.is_dir {
                folders.push(item);
            } else {
                files.push(item);
            }
        }

        if let Some(key) = SortKey::resolve(sort) {
            key.sort(&mut folders);
            key.sort(&mut files);
        }

        if page == 1 && files.len() > 1 && playlists.is_empty() {
            let remaining = total.saturating_sub(folders.len());
            playlists.push(self.auto_playlist(site, path, remaining, files.len()));
        }

        let mut list = folders;
        list.append(&mut playlists);
        list.append(&mut files);
        let result = CatalogPage::new(list, page, total, size);
        debug!("list {}${} page {}: {} entries of {}", site, path, page, result.list.len(), result.total);
        Ok(result)
    }

    fn to_entry(&self, site: &str, path: &str, e: &DirEntry) -> CatalogEntry {
        let id = CatalogId::new(site, format!("{path}/{}", e.name)).to_string();
        let kind = if e.is_dir { EntryKind::Folder } else { EntryKind::File };
        let mut entry = CatalogEntry::new(id, e.name.clone(), kind);
        entry.pic = cover(e.thumb.as_deref(), e.is_dir);
        entry.remarks = format_size(e.size);
        if e.is_dir {
            entry.remarks.push_str(FOLDER_REMARK);
        }
        entry.time = e.modified.clone();
        entry.size = e.size;
        entry
    }

    /// One summary per group of the folder's `playlist.txt`.
    async fn playlist_summaries(&self, site: &str, marker: &str) -> Result<Vec<CatalogEntry>> {
        let Some(text) = self
            .remote
            .read_file_content(site, marker)
            .await
            .map_err(CatalogError::RemoteUnavailable)?
        else {
            return Ok(Vec::new());
        };
        Ok(parse_groups(&text)
            .into_iter()
            .map(|(ordinal, group)| {
                let id = CatalogId::new(site, marker).with_index(ordinal);
                let mut entry = CatalogEntry::new(id.to_string(), group.name.clone(), EntryKind::File);
                entry.pic = group.cover.clone().unwrap_or_else(|| LIST_PIC.to_string());
                entry.remarks = group.remark();
                entry
            })
            .collect())
    }

    /// "All files here". The count is shown only when the whole folder is
    /// known to fit on this page.
    fn auto_playlist(&self, site: &str, path: &str, remaining: usize, files: usize) -> CatalogEntry {
        let id = CatalogId::new(site, format!("{path}{PLAYLIST}")).to_string();
        let mut entry = CatalogEntry::new(id, PLAYLIST_NAME, EntryKind::File);
        entry.pic = LIST_PIC.to_string();
        if remaining < self.config.page_size {
            entry.remarks = episode_remark(files);
        }
        entry
    }
}
