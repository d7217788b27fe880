//! tally-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the inventory API over HTTP.
//!
//! Committed stock changes are handed to an unbounded channel; a detached
//! task drains it and logs each change. The channel decouples notification
//! delivery from the transaction commit path entirely.

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;
use tally_core::notify::{ChangeSink, StockChange};
use tally_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, sync::mpsc};
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tally inventory server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,

  /// Override the configured bind address.
  #[arg(short, long)]
  bind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
  #[serde(default = "default_bind_addr")]
  bind_addr:  String,
  #[serde(default = "default_store_path")]
  store_path: String,
}

fn default_bind_addr() -> String { "127.0.0.1:8080".to_owned() }

fn default_store_path() -> String { "tally.db".to_owned() }

/// Forwards committed stock changes onto the logging channel. Send failures
/// (listener gone) are logged and swallowed — they never reach the mutation's
/// caller.
struct ChannelSink(mpsc::UnboundedSender<StockChange>);

impl ChangeSink for ChannelSink {
  fn notify(&self, change: StockChange) {
    if self.0.send(change).is_err() {
      tracing::warn!("change listener gone; dropping stock notification");
    }
  }
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
    .add_source(config::Environment::with_prefix("TALLY"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let bind_addr = cli.bind.unwrap_or(server_cfg.bind_addr);

  // Notification channel + detached logger task.
  let (tx, mut rx) = mpsc::unbounded_channel::<StockChange>();
  tokio::spawn(async move {
    while let Some(change) = rx.recv().await {
      tracing::info!(
        history_id = %change.history_id,
        product_id = %change.product_id,
        old_quantity = change.old_quantity,
        new_quantity = change.new_quantity,
        reason = change.reason.as_deref().unwrap_or("-"),
        "inventory changed"
      );
    }
  });

  // Open SQLite store with the channel sink attached.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {}", server_cfg.store_path))?
    .with_change_sink(Arc::new(ChannelSink(tx)));

  let app = tally_api::api_router(Arc::new(store))
    .layer(TraceLayer::new_for_http());

  let listener = TcpListener::bind(&bind_addr)
    .await
    .with_context(|| format!("failed to bind {bind_addr}"))?;
  tracing::info!(%bind_addr, "tally-server listening");

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}
