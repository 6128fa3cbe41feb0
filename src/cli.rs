use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Browse and search AList-backed video catalogs from the command line
#[derive(Parser)]
#[command(name = "vodcat")]
#[command(about = "Browse, search and expand playlists of AList-backed video catalogs", long_about = None)]
pub struct Cli {
    /// Config file (defaults to $VODCAT_CONFIG, then the user config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured sites as categories
    Categories,
    /// Search every searchable site
    Search {
        /// Keywords; all must appear in a match
        #[arg(required = true)]
        keyword: Vec<String>,
    },
    /// Browse a folder
    List {
        /// Catalog id, e.g. `movies$/2024`
        id: String,
        /// `name|time|size` and `asc|desc`, e.g. `time,desc`
        #[arg(short, long)]
        sort: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Show a file or expand a playlist
    Detail {
        id: String,
    },
    /// Resolve the raw URL of a file
    Play {
        site: String,
        path: String,
    },
    /// Download remote search indexes ahead of time
    Warm,
}
