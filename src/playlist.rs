//! Playlist directive text.
//!
//! ```text
//! #cover http://img/cover.jpg
//! #actor Someone
//! Season 1,#genre#,http://img/s1.jpg
//! Episode 1,s1/e01.mkv
//! Episode 2,s1/e02.mkv
//! Season 2,#genre#
//! Episode 1,s2/e01.mkv
//! ```
//!
//! A `,#genre#` line opens a new group. Lines before the first boundary belong
//! to an unnamed default group. Groups without episodes are dropped, and
//! ordinals count only the groups that are kept.

use tracing::warn;

use crate::error::CatalogError;
use crate::types::file_stem;

pub const GENRE_MARKER: &str = ",#genre#";
pub const PLAYLIST_NAME: &str = "播放列表";

const DIRECTIVES: [&str; 8] = ["name", "type", "actor", "director", "content", "lang", "area", "year"];

/// `#`-directives other than `#cover`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistMeta {
    pub name: Option<String>,
    pub type_name: Option<String>,
    pub actor: Option<String>,
    pub director: Option<String>,
    pub content: Option<String>,
    pub lang: Option<String>,
    pub area: Option<String>,
    pub year: Option<String>,
}

impl PlaylistMeta {
    fn apply(&mut self, directive: &str, value: &str) {
        let value = value.to_string();
        let slot = match directive {
            "name" => {
                // An empty #name keeps whatever name was there.
                if value.is_empty() {
                    return;
                }
                &mut self.name
            }
            "type" => &mut self.type_name,
            "actor" => &mut self.actor,
            "director" => &mut self.director,
            "content" => &mut self.content,
            "lang" => &mut self.lang,
            "area" => &mut self.area,
            "year" => &mut self.year,
            _ => return,
        };
        *slot = Some(value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub label: String,
    pub target: String,
}

impl Episode {
    /// `label,target[,...]`; a line without a non-blank target is malformed.
    pub fn parse(line: &str) -> Result<Self, CatalogError> {
        let mut parts = line.split(',');
        match (parts.next(), parts.next().map(str::trim)) {
            (Some(label), Some(target)) if !target.is_empty() => {
                Ok(Self { label: label.to_string(), target: target.to_string() })
            }
            _ => Err(CatalogError::MalformedPlaylistLine { line: line.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Raw(String),
    Resolved(Episode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistGroup {
    pub name: String,
    pub cover: Option<String>,
    pub meta: PlaylistMeta,
    items: Vec<Item>,
}

impl PlaylistGroup {
    fn named(name: impl Into<String>, cover: Option<String>) -> Self {
        Self { name: name.into(), cover, meta: PlaylistMeta::default(), items: Vec::new() }
    }

    /// One episode per file, in the given order, labelled by the name
    /// without extension.
    pub fn from_files<'a>(files: impl IntoIterator<Item = &'a str>) -> Self {
        let mut group = Self::named(PLAYLIST_NAME, None);
        group.items = files
            .into_iter()
            .map(|f| Item::Resolved(Episode { label: file_stem(f).to_string(), target: f.to_string() }))
            .collect();
        group
    }

    pub fn episode_count(&self) -> usize {
        self.items.len()
    }

    pub fn remark(&self) -> String {
        episode_remark(self.episode_count())
    }

    /// Playable pairs; malformed raw lines are logged and skipped.
    pub fn episodes(&self) -> Vec<Episode> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Resolved(ep) => Some(ep.clone()),
                Item::Raw(line) => match Episode::parse(line) {
                    Ok(ep) => Some(ep),
                    Err(e) => {
                        warn!("{}", e);
                        None
                    }
                },
            })
            .collect()
    }
}

pub fn episode_remark(count: usize) -> String {
    format!("共{count}集")
}

/// Trailing `#N` of the last path segment, e.g. `/a/playlist.txt#2` -> 2.
pub fn parse_ordinal(path: &str) -> Option<usize> {
    let segment = path.rsplit('/').next()?;
    let (_, ordinal) = segment.rsplit_once('#')?;
    ordinal.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeFirstGroup,
    InGroup,
}

#[derive(Debug, PartialEq, Eq)]
enum LineKind<'a> {
    Blank,
    Cover(&'a str),
    Directive(&'a str, &'a str),
    /// `#`-line that is not a known directive.
    Comment,
    Genre { name: &'a str, cover: Option<&'a str> },
    Episode(&'a str),
}

fn classify(line: &str) -> LineKind<'_> {
    let text = line.trim();
    if text.is_empty() {
        return LineKind::Blank;
    }
    if let Some(rest) = text.strip_prefix("#cover") {
        return LineKind::Cover(rest.trim());
    }
    if let Some(rest) = text.strip_prefix('#') {
        // Prefix match: `#year2021` sets the year.
        return DIRECTIVES
            .iter()
            .find_map(|&d| rest.strip_prefix(d).map(|value| LineKind::Directive(d, value.trim())))
            .unwrap_or(LineKind::Comment);
    }
    if text.contains(GENRE_MARKER) {
        let fields: Vec<&str> = text.split(',').collect();
        // Only `name,#genre#,cover` carries a cover; extra fields drop it.
        let cover = match fields.as_slice() {
            [_, _, cover] => Some(cover.trim()).filter(|c| !c.is_empty()),
            _ => None,
        };
        return LineKind::Genre { name: fields[0], cover };
    }
    LineKind::Episode(text)
}

/// Line-driven parser shared by the summary and single-group readers.
#[derive(Debug)]
struct Machine {
    state: State,
    current: PlaylistGroup,
    /// Every directive seen so far, across groups.
    seen: PlaylistMeta,
    emitted: usize,
}

impl Machine {
    fn new() -> Self {
        Self {
            state: State::BeforeFirstGroup,
            current: PlaylistGroup::named(PLAYLIST_NAME, None),
            seen: PlaylistMeta::default(),
            emitted: 0,
        }
    }

    fn take_current(&mut self, next: PlaylistGroup) -> Option<(usize, PlaylistGroup)> {
        let done = std::mem::replace(&mut self.current, next);
        if done.items.is_empty() {
            return None;
        }
        let ordinal = self.emitted;
        self.emitted += 1;
        Some((ordinal, done))
    }

    /// Feed one line; a finished group comes back when a boundary closes it.
    fn feed(&mut self, line: &str) -> Option<(usize, PlaylistGroup)> {
        match classify(line) {
            LineKind::Blank | LineKind::Comment => None,
            LineKind::Cover(url) => {
                self.current.cover = Some(url.to_string());
                None
            }
            LineKind::Directive(d, v) => {
                self.current.meta.apply(d, v);
                self.seen.apply(d, v);
                None
            }
            LineKind::Genre { name, cover } => {
                self.state = State::InGroup;
                self.take_current(PlaylistGroup::named(name, cover.map(str::to_string)))
            }
            LineKind::Episode(text) => {
                self.current.items.push(Item::Raw(text.to_string()));
                None
            }
        }
    }

    fn finish(mut self) -> Option<(usize, PlaylistGroup)> {
        self.take_current(PlaylistGroup::named("", None))
    }
}

/// All non-empty groups with their ordinals, in file order.
pub fn parse_groups(text: &str) -> Vec<(usize, PlaylistGroup)> {
    let mut machine = Machine::new();
    let mut out: Vec<_> = text.lines().filter_map(|line| machine.feed(line)).collect();
    out.extend(machine.finish());
    out
}

/// Result of reading one group out of a playlist file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistSelection {
    /// Group name; empty for the default group or when nothing matched.
    pub name: String,
    pub cover: Option<String>,
    /// Directives read up to the point the group was closed.
    pub meta: PlaylistMeta,
    pub episodes: Vec<Episode>,
}

/// Read group `ordinal`, or the default pre-boundary group when `None`.
/// Reading stops as soon as the wanted group is closed.
pub fn read_group(text: &str, ordinal: Option<usize>) -> PlaylistSelection {
    let mut machine = Machine::new();
    for line in text.lines() {
        match (ordinal, machine.feed(line)) {
            (Some(want), Some((ord, group))) if ord == want => return select(group, machine.seen),
            // Without an ordinal only the default group qualifies, and the
            // first boundary closes it.
            (None, Some((_, group))) => return select(group, machine.seen),
            (None, None) if machine.state == State::InGroup => {
                return PlaylistSelection { meta: machine.seen, ..Default::default() };
            }
            _ => {}
        }
    }
    let seen = machine.seen.clone();
    match (ordinal, machine.finish()) {
        (Some(want), Some((ord, group))) if ord == want => select(group, seen),
        (None, Some((_, group))) => select(group, seen),
        _ => PlaylistSelection { meta: seen, ..Default::default() },
    }
}

fn select(group: PlaylistGroup, meta: PlaylistMeta) -> PlaylistSelection {
    let episodes = group.episodes();
    let name = if group.name == PLAYLIST_NAME { String::new() } else { group.name };
    PlaylistSelection { name, cover: group.cover, meta, episodes }
}
