//! Communicator session for EnOcean radio modules speaking ESP3.
//!
//! The session borrows a duplex byte stream (a serial port, a TCP socket
//! — anything implementing tokio's `AsyncRead + AsyncWrite`), feeds the
//! incoming bytes to the `esp3-protocol` frame parser and hands typed
//! packets to the caller. On construction it reads the module's base ID;
//! while receiving it answers UTE teach-in requests automatically.
//!
//! ```no_run
//! use esp3_link::{Session, SessionConfig};
//!
//! # async fn demo() -> Result<(), esp3_link::LinkError> {
//! let (mut transport, _peer) = tokio::io::duplex(256);
//! let mut session = Session::connect(&mut transport, SessionConfig::default()).await?;
//! println!("module base ID: {:?}", session.base_id());
//!
//! let packet = session.receive().await?;
//! println!("{:?} received", packet.packet_type());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod session;

pub use config::SessionConfig;
pub use error::LinkError;
pub use session::{Session, SessionState};
