//! chamberd - ChamberChat daemon.
//!
//! An account-backed broadcast chat server: clients authenticate over a
//! line-oriented TCP protocol, then every message fans out to all other
//! connected sessions, with recent history replayed on join.

mod config;
mod db;
mod network;
mod security;
mod state;
mod util;

use crate::config::Config;
use crate::db::Database;
use crate::network::Gateway;
use crate::state::Roster;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "chamberd.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(server = %config.server.name, "Starting chamberd");

    let db_path = config
        .database
        .as_ref()
        .map(|d| d.path.as_str())
        .unwrap_or("chamberd.db");
    let db = Database::new(db_path).await?;

    // The roster is the only shared mutable state; it is built here and
    // handed to every connection worker.
    let roster = Roster::new();

    let gateway = Gateway::bind(&config, roster, db).await?;
    gateway.run().await
}
