//! Connection - drives one client from accept to disconnect.
//!
//! Each Connection runs in its own Tokio task, in two phases:
//!
//! - Phase 1: authentication gate. The client must REGISTER or LOGIN
//!   before any chat traffic; failures keep the gate open for retry.
//! - Phase 2: session loop. Register with the roster, replay history,
//!   then relay lines between the socket and the broadcast queue until
//!   the connection ends.
//!
//! Nothing here may take down the gateway: every fault ends at this
//! task's boundary.

mod event_loop;
mod handshake;

use crate::db::Database;
use crate::state::{ConnId, Roster};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{info, instrument};

/// Longest accepted input line, in bytes.
const MAX_LINE_LEN: usize = 1024;

/// A client connection handler.
pub struct Connection {
    id: ConnId,
    addr: SocketAddr,
    roster: Arc<Roster>,
    db: Database,
    replay_limit: u32,
    framed: Framed<TcpStream, LinesCodec>,
}

impl Connection {
    /// Create a new connection handler.
    pub fn new(
        id: ConnId,
        stream: TcpStream,
        addr: SocketAddr,
        roster: Arc<Roster>,
        db: Database,
        replay_limit: u32,
    ) -> Self {
        Self {
            id,
            addr,
            roster,
            db,
            replay_limit,
            framed: Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LEN)),
        }
    }

    /// Run the connection to completion.
    #[instrument(skip(self), fields(conn = self.id, addr = %self.addr), name = "connection")]
    pub async fn run(mut self) -> anyhow::Result<()> {
        // Phase 1: the gate. None means the client left before
        // authenticating; the session was never registered.
        let Some(username) = handshake::authenticate(&mut self.framed, &self.db).await? else {
            info!("Client left before authenticating");
            return Ok(());
        };

        info!(%username, "Authenticated");

        // Phase 2: the session loop deregisters on every exit path.
        event_loop::run(
            self.id,
            &username,
            &mut self.framed,
            &self.roster,
            &self.db,
            self.replay_limit,
        )
        .await;

        Ok(())
    }
}
