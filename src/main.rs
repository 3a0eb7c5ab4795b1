use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod blobs;
use blobs::FsBlobStore;

mod catalog;
use catalog::SqliteSongStore;

mod query;

mod server;
use server::{run_server, RequestsLoggingLevel};

mod service;

mod sqlite_persistence;

mod video_link;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite song catalog database file.
    #[clap(value_parser = parse_path)]
    pub catalog_db: PathBuf,

    /// Path to the directory holding uploaded cover images and sheet pdfs.
    #[clap(value_parser = parse_path)]
    pub blobs_dir: PathBuf,

    /// Public base URL under which uploaded files are served. Stored asset
    /// URLs are built from this, so it must match how clients reach the
    /// server.
    #[clap(long, default_value = "http://localhost:3001/v1/blobs")]
    pub public_blobs_url: String,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    info!(
        "Opening SQLite song catalog at {:?}...",
        cli_args.catalog_db
    );
    let song_store = Arc::new(SqliteSongStore::new(&cli_args.catalog_db)?);

    info!("Opening blob storage at {:?}...", cli_args.blobs_dir);
    let blob_store = Arc::new(FsBlobStore::new(
        &cli_args.blobs_dir,
        cli_args.public_blobs_url,
    )?);

    info!("Ready to serve at port {}!", cli_args.port);
    run_server(
        song_store,
        blob_store,
        cli_args.logging_level,
        cli_args.port,
        cli_args.frontend_dir_path,
    )
    .await
}
