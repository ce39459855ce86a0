//! Phase 2: the authenticated session loop.
//!
//! Registers the session, replays history, announces the join, then
//! relays lines until the connection ends. Deregistration (and the
//! leave notice it triggers) happens on every exit path.

use crate::db::Database;
use crate::state::{ConnId, Roster};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// One turn of the select loop, reduced to a plain value so the socket
/// is only borrowed once per turn.
enum Step {
    /// Client sent a line.
    Inbound(String),
    /// Client line could not be read; recoverable iff not an I/O fault.
    InboundError(LinesCodecError),
    /// Client closed the connection.
    Eof,
    /// A broadcast line is ready to deliver.
    Deliver(Arc<str>),
    /// The registry dropped this session (queue overflow prune).
    QueueClosed,
}

/// Run the session loop until the connection ends, then deregister.
pub(super) async fn run(
    id: ConnId,
    username: &str,
    framed: &mut Framed<TcpStream, LinesCodec>,
    roster: &Arc<Roster>,
    db: &Database,
    replay_limit: u32,
) {
    let mut queue = roster.insert(id, username);
    info!(%username, online = roster.len(), "Session registered");

    if let Err(e) = greet(framed, username, db, replay_limit).await {
        warn!(%username, error = %e, "Failed to deliver welcome");
        roster.remove_and_announce(id);
        return;
    }

    roster.announce_join(id, username);

    loop {
        let step = tokio::select! {
            read = framed.next() => match read {
                Some(Ok(line)) => Step::Inbound(line),
                Some(Err(e)) => Step::InboundError(e),
                None => Step::Eof,
            },
            queued = queue.recv() => match queued {
                Some(line) => Step::Deliver(line),
                None => Step::QueueClosed,
            },
        };

        match step {
            Step::Inbound(line) => {
                let body = line.trim();
                if body.eq_ignore_ascii_case("quit") {
                    debug!(%username, "Client quit");
                    break;
                }
                if body.is_empty() {
                    continue;
                }
                relay(roster, db, id, username, body).await;
            }

            Step::InboundError(LinesCodecError::MaxLineLengthExceeded) => {
                warn!(%username, "Over-long message dropped");
            }

            Step::InboundError(LinesCodecError::Io(e)) => {
                debug!(%username, error = %e, "Read failed");
                break;
            }

            Step::Eof => {
                debug!(%username, "Client disconnected");
                break;
            }

            Step::Deliver(line) => {
                if let Err(e) = framed.send(&*line).await {
                    warn!(%username, error = %e, "Write failed");
                    break;
                }
            }

            Step::QueueClosed => {
                debug!(%username, "Session pruned by registry");
                break;
            }
        }
    }

    roster.remove_and_announce(id);
}

/// Log a message and fan it out to everyone else.
///
/// History is best effort: a storage fault is logged and the live
/// message still goes out, stamped by the loop instead of the log.
async fn relay(roster: &Roster, db: &Database, id: ConnId, username: &str, body: &str) {
    match db.messages().append(username, body).await {
        Ok(stored) => roster.broadcast(&stored.to_line(), Some(id)),
        Err(e) => {
            warn!(%username, error = %e, "Failed to persist message");
            let line = format!("[{}] {}: {}", crate::util::clock_time(), username, body);
            roster.broadcast(&line, Some(id));
        }
    }
}

/// Welcome banner plus bounded history replay.
async fn greet(
    framed: &mut Framed<TcpStream, LinesCodec>,
    username: &str,
    db: &Database,
    replay_limit: u32,
) -> Result<(), LinesCodecError> {
    framed
        .send(format!("Welcome, {username}! Type 'quit' to leave."))
        .await?;

    match db.messages().recent(replay_limit).await {
        Ok(history) => {
            for message in &history {
                framed.send(message.to_line()).await?;
            }
        }
        Err(e) => {
            // A broken history store must not keep clients out.
            warn!(%username, error = %e, "Failed to load history for replay");
        }
    }

    Ok(())
}
