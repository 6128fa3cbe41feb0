mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use vodcat::config::AppConfig;
use vodcat::Vodcat;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vodcat=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let app = Vodcat::new(config).context("initializing catalog")?;

    match cli.command {
        Commands::Categories => print_json(&app.categories())?,
        Commands::Search { keyword } => print_json(&app.search(&keyword.join(" ")).await)?,
        Commands::List { id, sort, page } => {
            let result = app.list(&id, sort.as_deref(), page).await.with_context(|| format!("listing {id}"))?;
            print_json(&result)?
        }
        Commands::Detail { id } => {
            let result = app.detail(&id).await.with_context(|| format!("loading {id}"))?;
            print_json(&result)?
        }
        Commands::Play { site, path } => println!("{}", app.play_url(&site, &path).await?),
        Commands::Warm => {
            let ready = app.warm_index_cache().await;
            println!("{ready} index file(s) ready");
        }
    }
    Ok(())
}
