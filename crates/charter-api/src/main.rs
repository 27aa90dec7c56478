//! charter-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens an
//! in-process SQLite store, and serves the governance API over HTTP.
//!
//! # Token digest generation
//!
//! Entries in the config `tokens` table carry SHA-256 digests, never the
//! tokens themselves. To print the digest for a token entered on stdin:
//!
//! ```
//! cargo run -p charter-api --bin charter-server -- hash-token
//! ```
//!
//! # Bootstrapping an administrator
//!
//! Roles are granted by admins over the API, which needs one admin to exist
//! first. `grant-role` writes directly to the store:
//!
//! ```
//! charter-server grant-role --user-id sub-1 --email chair@example.org --role admin
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use charter_api::{AppState, ServerConfig, auth::token_digest};
use charter_core::identity::{Caller, Role};
use charter_core::store::GovernanceStore;
use charter_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Charter governance server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Print the SHA-256 digest for a token entered on stdin and exit.
  HashToken,
  /// Set a user's role directly in the store, creating the user if needed.
  GrantRole {
    /// The identity provider's subject id.
    #[arg(long)]
    user_id: String,
    /// Email to provision the user with when it does not exist yet.
    #[arg(long)]
    email:   String,
    /// One of `public`, `admin`, `policy_working_group`.
    #[arg(long)]
    role:    String,
  },
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

  if let Some(Command::HashToken) = cli.command {
    let token = read_stdin_line()?;
    println!("{}", token_digest(&token));
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CHARTER"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(Command::GrantRole { user_id, email, role }) = cli.command {
    let role = parse_role(&role)?;
    // Maintenance commands run as the service; this is the only place a
    // service caller is minted.
    store
      .ensure_user(&Caller::Service, &user_id, &email)
      .await
      .context("failed to provision user")?;
    let user = store
      .set_user_role(&Caller::Service, &user_id, role)
      .await
      .context("failed to set role")?;
    println!("{} ({}) is now {:?}", user.id, user.email, user.role);
    return Ok(());
  }

  let state = AppState {
    store:    Arc::new(store),
    verifier: Arc::new(server_cfg.verifier()),
    config:   Arc::new(server_cfg.clone()),
  };

  let app = charter_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

fn parse_role(s: &str) -> anyhow::Result<Role> {
  match s {
    "public" => Ok(Role::Public),
    "admin" => Ok(Role::Admin),
    "policy_working_group" => Ok(Role::PolicyWorkingGroup),
    other => anyhow::bail!("unknown role: {other}"),
  }
}

/// Read one line from stdin.
fn read_stdin_line() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Token: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
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
