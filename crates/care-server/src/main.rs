//! care-server binary.
//!
//! Serves the consultation API from a SQLite file named in `config.toml` (or
//! the file passed with `--config`). Any key can be overridden with a `CARE_`
//! prefixed environment variable, e.g. `CARE_PORT=9000`.
//!
//! Run with `--hash-password` to produce the PHC string for
//! `bootstrap_password_hash`.

use std::{io::BufRead as _, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use care_api::AppState;
use care_server::{ServerConfig, bootstrap_superuser, expand_tilde, hash_password};
use care_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Patient consultation API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Read a password from stdin, print its argon2 hash and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let phc = hash_password(line.trim_end_matches(['\n', '\r']))
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{phc}");
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  bootstrap_superuser(&store, &cfg)
    .await
    .context("failed to create bootstrap user")?;

  let app = care_api::router(AppState { store: Arc::new(store) });
  let address = cfg.address();
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  tracing::info!(%address, store = ?store_path, "care-server listening");
  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
