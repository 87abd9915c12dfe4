//! parkade-server binary.
//!
//! Reads `parkade.toml` (or the path given with `--config`) layered under
//! `PARKADE_*` environment variables, opens the SQLite store, provisions the
//! configured spots and serves the JSON API under `/api`.
//!
//! # Seeding
//!
//! ```text
//! parkade-server --seed 40
//! ```
//!
//! provisions spots `1..=40` (existing spots are kept) and exits.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use parkade_core::store::ParkingStore;
use parkade_server::{ServerConfig, router, spawn_ticker};
use parkade_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Parkade facility server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "parkade.toml")]
  config: PathBuf,

  /// Provision spots 1..=N and exit.
  #[arg(long, value_name = "N")]
  seed: Option<u32>,
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
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PARKADE").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_resolver(server_cfg.spot_policy.resolver())
    .with_projector(server_cfg.projector());

  // Helper mode: seed spots and exit.
  if let Some(count) = cli.seed {
    let spots = store
      .provision_spots(count)
      .await
      .context("failed to seed spots")?;
    println!("{} spots provisioned", spots.len());
    return Ok(());
  }

  store
    .provision_spots(server_cfg.capacity)
    .await
    .context("failed to provision spots")?;

  let store = Arc::new(store);
  let traffic = server_cfg.traffic();

  let ticker = server_cfg.tick_interval().map(|every| {
    tracing::info!(?every, "auto-ticker enabled");
    spawn_ticker(store.clone(), traffic.clone(), every)
  });

  let app = router(store, traffic);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .context("server error")?;

  if let Some(ticker) = ticker {
    ticker.abort();
  }
  tracing::info!("shut down");

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
