//! Shared server state.
//!
//! Contains the Roster (live-session registry) and connection id minting.

mod conn_id;
mod roster;

pub use conn_id::{ConnId, ConnIdGenerator};
pub use roster::Roster;
