//! Gateway - TCP listener that accepts incoming connections.
//!
//! The Gateway binds to the configured address and spawns one Connection
//! task per accepted client, so no single connection can hold up the
//! accept loop. There is no cap on concurrent connections; admission
//! control is out of scope.

use crate::config::Config;
use crate::db::Database;
use crate::network::Connection;
use crate::state::{ConnIdGenerator, Roster};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

/// The Gateway accepts incoming TCP connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    roster: Arc<Roster>,
    db: Database,
    replay_limit: u32,
    conn_ids: ConnIdGenerator,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    pub async fn bind(config: &Config, roster: Arc<Roster>, db: Database) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.listen.address).await?;
        info!(address = %config.listen.address, "Listener bound");

        Ok(Self {
            listener,
            roster,
            db,
            replay_limit: config.history.replay_limit,
            conn_ids: ConnIdGenerator::new(),
        })
    }

    /// Run the gateway, accepting connections forever.
    ///
    /// A worker that fails only takes down its own connection; accept
    /// errors are logged and the loop keeps going.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let id = self.conn_ids.next();
                    info!(conn = id, %addr, "Connection accepted");

                    let roster = Arc::clone(&self.roster);
                    let db = self.db.clone();
                    let replay_limit = self.replay_limit;

                    tokio::spawn(async move {
                        let connection =
                            Connection::new(id, stream, addr, roster, db, replay_limit);
                        if let Err(e) = connection.run().await {
                            error!(conn = id, %addr, error = %e, "Connection error");
                        }
                        info!(conn = id, %addr, "Connection closed");
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
