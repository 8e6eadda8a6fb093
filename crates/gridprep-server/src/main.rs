//! gridprep server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite warehouse, and serves the pipeline HTTP surface.
//!
//! # Loading CSV feeds
//!
//! To load the raw feed files into the warehouse and exit:
//!
//! ```
//! cargo run -p gridprep-server -- --load ./feeds
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use gridprep_server::{AppState, ServerConfig, cache::ReferenceCache};
use gridprep_store_sqlite::{SqliteStore, load_dir};

#[derive(Parser)]
#[command(author, version, about = "Gridprep location pipeline server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Load CSV feed files from this directory and exit.
  #[arg(long, value_name = "DIR")]
  load: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("db_path", "gridprep.db")?
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("GRIDPREP"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open the SQLite warehouse.
  let store = SqliteStore::open(&server_cfg.db_path)
    .await
    .with_context(|| {
      format!("failed to open warehouse at {:?}", server_cfg.db_path)
    })?;

  // Helper mode: run the CSV loader and exit.
  if let Some(dir) = cli.load {
    let reports = load_dir(&store, &dir)
      .await
      .with_context(|| format!("failed to load feeds from {dir:?}"))?;
    for report in &reports {
      println!("{}: {} rows", report.file, report.rows);
    }
    return Ok(());
  }

  // Build application state.
  let cache = ReferenceCache::load_or_fallback(&store).await;
  let state = AppState {
    store:  Arc::new(store),
    cache:  Arc::new(cache),
    config: Arc::new(server_cfg.clone()),
  };

  let app = gridprep_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
