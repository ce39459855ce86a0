//! Phase 1: the authentication gate.
//!
//! A small per-connection state machine: AwaitingCredentials until a
//! REGISTER or LOGIN line succeeds, then Authenticated; EOF at any point
//! closes the gate. Every rejection re-prompts with `AUTH_REQUIRED`, so
//! the client retries on the same connection.

use crate::db::{Database, DbError};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error, warn};

/// Why an authentication attempt was rejected.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid format, expected ACTION:username:password")]
    MalformedLine,

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl AuthError {
    /// Render the `AUTH_ERROR:` line sent to the client.
    ///
    /// Storage faults collapse to a generic message; internals stay in
    /// the server log.
    fn to_reply(&self) -> String {
        match self {
            AuthError::Db(DbError::Sqlx(_) | DbError::Migration(_) | DbError::Hash) => {
                "AUTH_ERROR:temporary server error, try again later".to_string()
            }
            other => format!("AUTH_ERROR:{other}"),
        }
    }

    /// Whether this rejection hides a storage fault worth logging loudly.
    fn is_storage_fault(&self) -> bool {
        matches!(
            self,
            AuthError::Db(DbError::Sqlx(_) | DbError::Migration(_) | DbError::Hash)
        )
    }
}

/// Drive the gate until the client authenticates or gives up.
///
/// Returns the bound username, or `None` if the connection ended while
/// still awaiting credentials. `Err` means the socket broke while we
/// were writing to it.
pub(super) async fn authenticate(
    framed: &mut Framed<TcpStream, LinesCodec>,
    db: &Database,
) -> anyhow::Result<Option<String>> {
    loop {
        framed.send("AUTH_REQUIRED").await?;

        let line = match framed.next().await {
            Some(Ok(line)) => line,
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                warn!("Over-long line while awaiting credentials");
                framed.send("AUTH_ERROR:line too long").await?;
                continue;
            }
            Some(Err(LinesCodecError::Io(e))) => {
                debug!(error = %e, "Read failed while awaiting credentials");
                return Ok(None);
            }
            None => return Ok(None),
        };

        match handle_line(db, line.trim()).await {
            Ok((username, reason)) => {
                framed.send(format!("AUTH_SUCCESS:{reason}")).await?;
                return Ok(Some(username));
            }
            Err(e) => {
                if e.is_storage_fault() {
                    error!(error = %e, "Credential storage fault during authentication");
                }
                framed.send(e.to_reply()).await?;
            }
        }
    }
}

/// Handle one credentials line. Returns the bound username and the
/// human-readable success reason.
async fn handle_line(db: &Database, line: &str) -> Result<(String, String), AuthError> {
    let (action, username, password) = parse_line(line)?;

    match action {
        "REGISTER" => {
            let user = db.users().create_user(username, password).await?;
            Ok((
                user.username.clone(),
                format!("account created, welcome {}!", user.username),
            ))
        }
        "LOGIN" => {
            let user = db.users().verify(username, password).await?;
            Ok((
                user.username.clone(),
                format!("welcome back, {}!", user.username),
            ))
        }
        other => Err(AuthError::UnknownAction(other.to_string())),
    }
}

/// Split one pre-auth line into (action, username, password).
///
/// Only the first two colons delimit fields; the password keeps any
/// further colons.
fn parse_line(line: &str) -> Result<(&str, &str, &str), AuthError> {
    let mut parts = line.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(action), Some(username), Some(password)) => Ok((action, username, password)),
        _ => Err(AuthError::MalformedLine),
    }
}
