//! `parkade-sim`: terminal simulator for a Parkade facility.
//!
//! # Usage
//!
//! ```
//! parkade-sim --capacity 25 --tick-secs 2
//! parkade-sim --url http://localhost:8080
//! parkade-sim --config ~/.config/parkade/sim.toml
//! ```
//!
//! Without `--url` the facility lives in memory and random traffic drives
//! it. With `--url` every cycle runs on the server.

mod app;
mod client;
mod sim;
mod ui;

use std::{fs::File, io, path::PathBuf, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use client::ApiClient;
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use parkade_core::{
  memory::MemoryStore,
  policy::RandomFree,
  projector::{DEFAULT_RATE_PER_SECOND, StateProjector},
  resolver::CycleResolver,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use sim::Backend;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "parkade-sim", about = "Terminal simulator for a Parkade facility")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of a parkade server. Runs locally when unset.
  #[arg(long, env = "PARKADE_URL")]
  url: Option<String>,

  /// Number of spots in a local facility (default: 25).
  #[arg(long)]
  capacity: Option<u32>,

  /// Seconds between automatic cycles (default: 5).
  #[arg(long)]
  tick_secs: Option<u64>,

  /// Price per parked second in a local facility.
  #[arg(long)]
  rate: Option<f64>,

  /// Park arrivals on a random free spot instead of the lowest one.
  #[arg(long)]
  random_spots: bool,

  /// Write logs here; the terminal belongs to the UI.
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
  url:          Option<String>,
  capacity:     Option<u32>,
  tick_secs:    Option<u64>,
  rate:         Option<f64>,
  random_spots: bool,
  log_file:     Option<PathBuf>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  if let Some(path) = args.log_file.or(file_cfg.log_file) {
    let file = File::create(&path)
      .with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
      .with_env_filter(
        EnvFilter::builder()
          .with_default_directive(LevelFilter::INFO.into())
          .from_env_lossy(),
      )
      .with_writer(Mutex::new(file))
      .with_ansi(false)
      .init();
  }

  let tick_every = Duration::from_secs(args.tick_secs.or(file_cfg.tick_secs).unwrap_or(5).max(1));

  let backend = match args.url.or(file_cfg.url) {
    Some(url) => Backend::Remote(ApiClient::new(url)?),
    None => {
      let capacity = args.capacity.or(file_cfg.capacity).unwrap_or(25);
      let projector = StateProjector {
        rate_per_second: args.rate.or(file_cfg.rate).unwrap_or(DEFAULT_RATE_PER_SECOND),
        ..StateProjector::default()
      };
      let mut store = MemoryStore::new(capacity).with_projector(projector);
      if args.random_spots || file_cfg.random_spots {
        store = store.with_resolver(CycleResolver::new(RandomFree));
      }
      Backend::local(store)
    }
  };
  tracing::info!(backend = %backend.describe(), ?tick_every, "starting simulator");

  let mut app = App::new(backend, tick_every);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Load initial data.
  let load_result = app.refresh().await;

  // Run the event loop; restore terminal even on error.
  let run_result = if load_result.is_ok() {
    run_event_loop(&mut terminal, &mut app).await
  } else {
    load_result
  };

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event {
      if !app.handle_key(key).await? {
        break;
      }
    }

    app.on_tick().await;
  }

  Ok(())
}
