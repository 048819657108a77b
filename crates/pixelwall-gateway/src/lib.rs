//! WebSocket plumbing for the wall: room fan-out, the presence roster, and
//! the per-connection session loops for the canvas and chat channels.

pub mod canvas;
pub mod chat;
pub mod dispatcher;
pub mod presence;

use std::time::Duration;

pub use dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
pub(crate) const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// How long a session waits on the store before giving up on the whole
/// connection. An ordinary store error is logged and the operation skipped;
/// a timeout means the store is wedged and the client should reconnect.
pub(crate) const STORE_TIMEOUT: Duration = Duration::from_secs(5);
