//! Error types for the communicator session.

use std::io;

use thiserror::Error;

use esp3_protocol::ProtocolError;

/// Errors surfaced by a communicator session.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Transport I/O failure, propagated verbatim. Retry and reconnect
    /// decisions belong to the caller.
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// A malformed frame was drained from the stream. The session stays
    /// usable; the next `receive` continues at the following frame.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The base-ID handshake did not complete within the configured
    /// deadline.
    #[error("Timed out waiting for the base ID response")]
    BaseIdTimeout,

    /// The transport reached end of stream.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation on a closed session.
    #[error("Session is closed")]
    Closed,
}
