use std::path::PathBuf;

/// Failures surfaced by the catalog core.
///
/// `MalformedPlaylistLine` and `UnrecognizedSort` are recoverable: they are
/// produced while parsing and logged, never returned from a public operation.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("index file for site {site} unavailable: {reason}")]
    IndexUnavailable { site: String, reason: String },

    #[error("corrupt index archive {}: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("remote file service failed: {0:#}")]
    RemoteUnavailable(#[source] anyhow::Error),

    #[error("malformed playlist line: {line}")]
    MalformedPlaylistLine { line: String },

    #[error("unrecognized sort key: {0}")]
    UnrecognizedSort(String),

    #[error("invalid catalog id: {0}")]
    InvalidId(String),

    #[error("unknown site: {0}")]
    UnknownSite(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CatalogError {
    pub(crate) fn index(site: &str, reason: impl std::fmt::Display) -> Self {
        CatalogError::IndexUnavailable { site: site.to_string(), reason: reason.to_string() }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        CatalogError::CorruptArchive { path: path.into(), reason: reason.to_string() }
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
