//! Communicator session over an ESP3 byte stream.

use bytes::{Buf, BytesMut};
use chrono::Utc;
use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use esp3_protocol::{
    common_command, parse_frame, BaseId, DataPacket, FrameParse, Packet,
};

use crate::config::SessionConfig;
use crate::error::LinkError;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the base-ID response during construction.
    AwaitingBaseId,
    /// Handshake complete, packets flow.
    Ready,
    /// Closed by the caller; no further operations.
    Closed,
}

/// A communicator session over a borrowed duplex byte stream.
///
/// The session owns its read buffer and drives the frame parser over it.
/// The transport is only borrowed: closing it is the caller's job, and
/// [`close`](Session::close) never touches it. One logical consumer at a
/// time — `receive` and `send` take `&mut self`; wrap the session in a
/// mutex to share it across tasks.
pub struct Session<'t, T> {
    transport: &'t mut T,
    read_buf: BytesMut,
    base_id: Option<BaseId>,
    teach_in: bool,
    read_chunk: usize,
    state: SessionState,
}

impl<'t, T> Session<'t, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Establish a session over `transport`.
    ///
    /// Non-client sessions send a CO_RD_IDBASE command and wait for the
    /// matching response before becoming ready; anything else arriving
    /// meanwhile is discarded. Construction either fully succeeds or
    /// fails — on [`LinkError::BaseIdTimeout`] the partially-built
    /// session is dropped, never returned.
    pub async fn connect(
        transport: &'t mut T,
        config: SessionConfig,
    ) -> Result<Session<'t, T>, LinkError> {
        let mut session = Session {
            transport,
            read_buf: BytesMut::with_capacity(config.read_chunk),
            base_id: None,
            teach_in: config.teach_in,
            read_chunk: config.read_chunk,
            state: SessionState::AwaitingBaseId,
        };

        if config.is_client {
            session.state = SessionState::Ready;
            return Ok(session);
        }

        let request = Packet::Data(DataPacket::common_command(common_command::CO_RD_IDBASE));
        session.write_packet(&request).await?;

        let base_id = timeout(config.handshake_timeout, session.await_base_id())
            .await
            .map_err(|_| LinkError::BaseIdTimeout)??;

        info!("base ID handshake complete: {base_id}");
        session.base_id = Some(base_id);
        session.state = SessionState::Ready;
        Ok(session)
    }

    /// Receive the next packet from the transport.
    ///
    /// Blocks (suspends) only while waiting for more transport bytes.
    /// When the packet is a UTE teach-in request and auto-response is
    /// enabled, the synthesized reply is written to the transport before
    /// the request is returned, so the peer sees it promptly.
    ///
    /// A malformed frame surfaces as [`LinkError::Protocol`] after the
    /// offending bytes are drained; the session stays usable and the
    /// next call continues at the following frame.
    pub async fn receive(&mut self) -> Result<Packet, LinkError> {
        self.ensure_open()?;
        let packet = self.next_packet().await?;

        if let Packet::UteTeachIn(request) = &packet {
            if self.teach_in {
                match self.base_id {
                    Some(base_id) => {
                        let response = Packet::Radio(request.create_response_packet(base_id));
                        self.write_packet(&response).await?;
                        debug!(
                            "answered teach-in request from {:02X?}",
                            request.sender_id()
                        );
                    }
                    None => warn!("teach-in request received but no base ID is known"),
                }
            }
        }

        Ok(packet)
    }

    /// Serialize `packet` and write it to the transport.
    ///
    /// Transport failures propagate unchanged; there is no retry at this
    /// layer.
    pub async fn send(&mut self, packet: &Packet) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.write_packet(packet).await
    }

    /// The cached base ID, captured during the construction handshake.
    /// Client sessions have none.
    pub fn base_id(&self) -> Option<BaseId> {
        self.base_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Mark the session closed. Idempotent. The transport stays open —
    /// its lifetime belongs to the caller.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            debug!("session closed");
            self.state = SessionState::Closed;
        }
    }

    /// Wait for the CO_RD_IDBASE response: a response packet with an OK
    /// return code and exactly 4 bytes of response data. Everything else
    /// is discarded — the deliberate wait-for-the-reply policy.
    async fn await_base_id(&mut self) -> Result<BaseId, LinkError> {
        loop {
            match self.next_packet().await {
                Ok(Packet::Response(response))
                    if response.response_code().is_ok()
                        && response.response_data().len() == 4 =>
                {
                    let mut id = [0u8; 4];
                    id.copy_from_slice(response.response_data());
                    return Ok(BaseId(id));
                }
                Ok(packet) => {
                    debug!(
                        "discarding {:?} packet while awaiting the base ID",
                        packet.packet_type()
                    );
                }
                Err(LinkError::Protocol(e)) => {
                    // Malformed traffic does not abort the handshake.
                    debug!("skipping malformed frame while awaiting the base ID: {e}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Parse one frame out of the owned buffer, reading more transport
    /// bytes whenever the parser reports an incomplete frame.
    async fn next_packet(&mut self) -> Result<Packet, LinkError> {
        loop {
            match parse_frame(&self.read_buf) {
                FrameParse::Parsed { mut packet, consumed } => {
                    self.read_buf.advance(consumed);
                    packet.stamp_received(Utc::now());
                    trace!("received {:?} ({consumed} bytes)", packet.packet_type());
                    return Ok(packet);
                }
                FrameParse::Invalid { reason, skip } => {
                    let skip = skip.min(self.read_buf.len());
                    self.read_buf.advance(skip);
                    debug!("dropped {skip} bytes of malformed frame: {reason}");
                    return Err(reason.into());
                }
                FrameParse::Incomplete { needed } => {
                    self.read_buf.reserve(self.read_chunk.max(needed));
                    let n = self.transport.read_buf(&mut self.read_buf).await?;
                    if n == 0 {
                        return Err(LinkError::ConnectionClosed);
                    }
                }
            }
        }
    }

    async fn write_packet(&mut self, packet: &Packet) -> Result<(), LinkError> {
        let frame = packet.to_bytes()?;
        self.transport.write_all(&frame).await?;
        self.transport.flush().await?;
        trace!("sent {:?} ({} bytes)", packet.packet_type(), frame.len());
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), LinkError> {
        match self.state {
            SessionState::Closed => Err(LinkError::Closed),
            _ => Ok(()),
        }
    }

    #[cfg(test)]
    fn set_base_id(&mut self, base_id: BaseId) {
        self.base_id = Some(base_id);
    }
}
