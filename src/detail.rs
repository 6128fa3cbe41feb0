//! Single-item views: file detail, playlist expansion and play links.

use tracing::{debug, info};

use crate::catalog::{cover, CatalogBuilder};
use crate::error::{CatalogError, Result};
use crate::natural;
use crate::playlist::{read_group, Episode, PlaylistGroup};
use crate::types::{fix_http, fix_path, parent_path, CatalogEntry, CatalogId, CatalogPage, EntryKind, LIST_PIC, PLAYLIST, PLAYLIST_TXT};

const PLAY_SEPARATOR: &str = "#";

impl CatalogBuilder {
    pub async fn detail(&self, id: &CatalogId) -> Result<CatalogPage> {
        self.site(&id.site)?;
        if id.path.contains(PLAYLIST) || id.path.contains(PLAYLIST_TXT) {
            return self.playlist(id).await;
        }
        let d = self.remote.get_file(&id.site, &id.path).await.map_err(CatalogError::RemoteUnavailable)?;
        let kind = if d.is_dir { EntryKind::Folder } else { EntryKind::File };
        let mut entry = CatalogEntry::new(id.to_string(), d.name.clone(), kind);
        entry.time = d.modified;
        entry.pic = cover(d.thumb.as_deref(), d.is_dir);
        entry.play_from = d.provider;
        entry.play_url = Some(format!("{}${}", d.name, fix_http(&d.raw_url)));
        entry.content = Some(id.to_string());
        let result = CatalogPage::single(vec![entry]);
        debug!("detail: {:?}", result);
        Ok(result)
    }

    /// Expand a playlist id into one entry whose play URL lists every episode.
    pub async fn playlist(&self, id: &CatalogId) -> Result<CatalogPage> {
        info!("load playlist: {} {}", id.site, id.full_path());
        if !id.path.contains(PLAYLIST) {
            return self.playlist_from_file(id).await;
        }
        let site = self.site(&id.site)?;
        let folder = parent_path(&id.path);
        let d = self.remote.get_file(&id.site, folder).await.map_err(CatalogError::RemoteUnavailable)?;

        let mut entry = CatalogEntry::new(id.to_string(), d.name, EntryKind::File);
        entry.time = d.modified;
        entry.play_from = d.provider;
        entry.content = Some(format!("{}${}", id.site, folder));
        entry.pic = LIST_PIC.to_string();

        let listing = self.remote.list_directory(&id.site, folder, 1, 0).await.map_err(CatalogError::RemoteUnavailable)?;
        let mut files: Vec<_> = listing
            .entries
            .into_iter()
            .filter(|e| !e.is_dir && self.config.is_media_format(&e.name))
            .collect();
        if self.config.sort_playlist(site) {
            natural::sort_by_name(&mut files, |e| e.name.as_str());
        }
        let group = PlaylistGroup::from_files(files.iter().map(|e| e.name.as_str()));
        entry.play_url = Some(self.play_list_url(&id.site, folder, &group.episodes())?);

        let result = CatalogPage::single(vec![entry]);
        debug!("playlist: {:?}", result);
        Ok(result)
    }

    async fn playlist_from_file(&self, id: &CatalogId) -> Result<CatalogPage> {
        let folder = parent_path(&id.path);
        let d = self.remote.get_file(&id.site, folder).await.map_err(CatalogError::RemoteUnavailable)?;
        let mut entry = CatalogEntry::new(id.to_string(), d.name, EntryKind::File);
        entry.time = d.modified;
        entry.play_from = d.provider;
        entry.pic = LIST_PIC.to_string();

        let text = self
            .remote
            .read_file_content(&id.site, &id.path)
            .await
            .map_err(CatalogError::RemoteUnavailable)?
            .unwrap_or_default();
        let selection = read_group(&text, id.index);
        let meta = selection.meta;
        if let Some(name) = meta.name {
            entry.name = name;
        }
        entry.type_name = meta.type_name;
        entry.actor = meta.actor;
        entry.director = meta.director;
        entry.content = meta.content;
        entry.lang = meta.lang;
        entry.area = meta.area;
        entry.year = meta.year;
        if let Some(c) = selection.cover {
            entry.pic = c;
        }
        entry.play_url = Some(self.play_list_url(&id.site, folder, &selection.episodes)?);
        entry.name = format!("{} {}", entry.name, selection.name);

        let result = CatalogPage::single(vec![entry]);
        debug!("playlist: {:?}", result);
        Ok(result)
    }

    /// Raw URL of one file, with protocol-relative links made explicit.
    pub async fn play_url(&self, site: &str, path: &str) -> Result<String> {
        self.site(site)?;
        let d = self.remote.get_file(site, path).await.map_err(CatalogError::RemoteUnavailable)?;
        Ok(fix_http(&d.raw_url))
    }

    /// Link back to [`Self::play_url`] through the configured play endpoint.
    pub fn play_link(&self, site: &str, path: &str) -> Result<String> {
        let mut url = url::Url::parse(&self.config.play_base_url)
            .map_err(|e| CatalogError::Config(format!("play_base_url: {e}")))?;
        url.query_pairs_mut().append_pair("site", site).append_pair("path", path);
        Ok(url.to_string())
    }

    fn play_list_url(&self, site: &str, folder: &str, episodes: &[Episode]) -> Result<String> {
        let mut parts = Vec::with_capacity(episodes.len());
        for ep in episodes {
            let link = self.play_link(site, &fix_path(&format!("{folder}/{}", ep.target)))?;
            parts.push(format!("{}${}", ep.label, link));
        }
        Ok(parts.join(PLAY_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{AppConfig, SiteConfig};
    use crate::remote::mock::{folder, media, MockFs};
    use crate::types::FileDetail;

    fn builder(sort: bool, remote: MockFs) -> CatalogBuilder {
        let config = AppConfig {
            play_base_url: "http://box:4567/play".into(),
            sites: vec![SiteConfig { name: "tv".into(), sort: Some(sort), ..Default::default() }],
            ..Default::default()
        };
        CatalogBuilder::new(Arc::new(config), Arc::new(remote))
    }

    fn detail(name: &str, raw_url: &str) -> FileDetail {
        FileDetail {
            name: name.into(),
            modified: "2024-02-02T00:00:00Z".into(),
            provider: Some("Local".into()),
            raw_url: raw_url.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn file_detail_fixes_protocol_relative_urls() {
        let remote = MockFs::default().file("tv", "/m/a.mp4", detail("a.mp4", "//cdn.example/a.mp4"));
        let b = builder(true, remote);
        let page = b.detail(&"tv$/m/a.mp4".parse().unwrap()).await.unwrap();
        let e = &page.list[0];
        assert_eq!(e.play_url.as_deref(), Some("a.mp4$http://cdn.example/a.mp4"));
        assert_eq!(e.play_from.as_deref(), Some("Local"));
        assert_eq!(e.content.as_deref(), Some("tv$/m/a.mp4"));
        assert_eq!(page.total, 1);
        assert_eq!(b.play_url("tv", "/m/a.mp4").await.unwrap(), "http://cdn.example/a.mp4");
    }

    #[tokio::test]
    async fn auto_playlist_lists_media_in_natural_order() {
        let remote = MockFs::default()
            .file("tv", "/show", detail("show", ""))
            .dir("tv", "/show", vec![media("ep10.mp4", 1), folder("x.mp4"), media("ep2.mp4", 1), media("cover.jpg", 1)]);
        let b = builder(true, remote);
        let page = b.detail(&"tv$/show/~playlist".parse().unwrap()).await.unwrap();
        let e = &page.list[0];
        assert_eq!(e.name, "show");
        assert_eq!(e.content.as_deref(), Some("tv$/show"));
        assert_eq!(
            e.play_url.as_deref(),
            Some("ep2$http://box:4567/play?site=tv&path=%2Fshow%2Fep2.mp4#ep10$http://box:4567/play?site=tv&path=%2Fshow%2Fep10.mp4")
        );
    }

    #[tokio::test]
    async fn auto_playlist_keeps_remote_order_when_sort_is_off() {
        let remote = MockFs::default()
            .file("tv", "/show", detail("show", ""))
            .dir("tv", "/show", vec![media("ep10.mp4", 1), media("ep2.mp4", 1)]);
        let page = builder(false, remote).playlist(&"tv$/show/~playlist".parse().unwrap()).await.unwrap();
        assert!(page.list[0].play_url.as_deref().unwrap().starts_with("ep10$"));
    }

    #[tokio::test]
    async fn playlist_file_group_with_metadata() {
        let text = "#name Great Show\n#year 1999\n#actor A B\nS1,#genre#\nOne,e1.mkv\nS2,#genre#,http://img/s2\nTwo,sub/e2.mkv\nbad\n";
        let remote = MockFs::default()
            .file("tv", "/show", detail("show", ""))
            .content("tv", "/show/playlist.txt", text);
        let b = builder(true, remote);
        let page = b.detail(&"tv$/show/playlist.txt#1".parse().unwrap()).await.unwrap();
        let e = &page.list[0];
        assert_eq!(e.id, "tv$/show/playlist.txt#1");
        assert_eq!(e.name, "Great Show S2");
        assert_eq!(e.year.as_deref(), Some("1999"));
        assert_eq!(e.actor.as_deref(), Some("A B"));
        assert_eq!(e.pic, "http://img/s2");
        assert_eq!(e.play_url.as_deref(), Some("Two$http://box:4567/play?site=tv&path=%2Fshow%2Fsub%2Fe2.mkv"));
    }

    #[tokio::test]
    async fn missing_file_surfaces_remote_error() {
        let b = builder(true, MockFs::default());
        let err = b.detail(&"tv$/nope.mp4".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, CatalogError::RemoteUnavailable(_)));
    }
}
