//! onboard-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the onboarding API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `hr_password_hash` in config.toml:
//!
//! ```
//! cargo run -p onboard-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use onboard_server::{
  AppState, ServerConfig,
  auth::{AuthConfig, hash_password},
  mailer::Mailer,
  storage::DiskStorage,
};
use onboard_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Employee onboarding server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
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
    let password = read_password()?;
    let hash = hash_password(&password)?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("ONBOARD")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.store_path   = expand_tilde(&server_cfg.store_path);
  server_cfg.upload_dir   = expand_tilde(&server_cfg.upload_dir);
  server_cfg.template_dir = expand_tilde(&server_cfg.template_dir);

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  tokio::fs::create_dir_all(&server_cfg.upload_dir)
    .await
    .with_context(|| format!("failed to create {:?}", server_cfg.upload_dir))?;

  let mailer = Mailer::from_config(&server_cfg.mail).context("invalid mail settings")?;
  tracing::info!(transport = ?server_cfg.mail.transport, "mail configured");

  let state = AppState {
    store:     Arc::new(store),
    files:     Arc::new(DiskStorage::new(&server_cfg.upload_dir)),
    templates: Arc::new(DiskStorage::new(&server_cfg.template_dir)),
    mailer:    Arc::new(mailer),
    auth:      Arc::new(AuthConfig {
      hr_username:      server_cfg.hr_username.clone(),
      hr_password_hash: server_cfg.hr_password_hash.clone(),
    }),
    config:    Arc::new(server_cfg.clone()),
  };

  let app = onboard_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
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
