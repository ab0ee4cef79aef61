//! Session configuration.

use std::time::Duration;

/// Configuration for a communicator session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Automatically answer UTE teach-in requests.
    pub teach_in: bool,
    /// Client mode: skip the base-ID handshake on construction.
    pub is_client: bool,
    /// Deadline for the base-ID handshake.
    pub handshake_timeout: Duration,
    /// Transport read granularity in bytes.
    pub read_chunk: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            teach_in: true,
            is_client: false,
            handshake_timeout: Duration::from_secs(2),
            read_chunk: 4096,
        }
    }
}
