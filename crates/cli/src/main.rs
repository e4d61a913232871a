use album_core::config;
use album_core::pipeline::Album;
use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::commands;
use cli::render;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    let album = Album::open(&cfg).await?;

    match cli.command {
        Commands::Upload { files, json } => run_upload(&album, &files, json).await,
        Commands::Search { query, json } => run_search(&album, &query, json).await,
        Commands::List { json } => run_list(&album, json).await,
        Commands::Clear { json } => run_clear(&album, json).await,
    }
}

#[derive(Parser)]
#[command(name = "album")]
#[command(about = "Furniture photo album with AI classification", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload and classify photos
    Upload {
        /// Image files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Natural-language search, e.g. "white wooden bed"
    Search {
        /// Free-text query
        query: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List every record in the catalog
    List {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all records (stored images are kept)
    Clear {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

async fn run_upload(album: &Album, files: &[PathBuf], json: bool) -> Result<()> {
    let report = commands::upload(album, files).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render::report_text(&report));
        let rows = commands::list(album).await?;
        println!("catalog now holds {} record(s)", rows.len());
    }
    Ok(())
}

async fn run_search(album: &Album, query: &str, json: bool) -> Result<()> {
    let rows = commands::search(album, query).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", render::records_text(&rows));
    }
    Ok(())
}

async fn run_list(album: &Album, json: bool) -> Result<()> {
    let rows = commands::list(album).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", render::records_text(&rows));
    }
    Ok(())
}

async fn run_clear(album: &Album, json: bool) -> Result<()> {
    let removed = commands::clear(album).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "status": "ok",
                "removed": removed,
            }))?
        );
    } else {
        println!("removed {} record(s)", removed);
    }
    Ok(())
}
