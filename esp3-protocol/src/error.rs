//! Error types for the ESP3 wire protocol.

use std::fmt;

use thiserror::Error;

/// Which checksummed section of a frame failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumSegment {
    /// The 4-byte length/type header.
    Header,
    /// The data plus optional-data payload.
    Data,
}

impl fmt::Display for ChecksumSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumSegment::Header => write!(f, "header"),
            ChecksumSegment::Data => write!(f, "data"),
        }
    }
}

/// Protocol-level errors that can occur while parsing or building frames.
///
/// An incomplete frame is deliberately NOT represented here: waiting for
/// more bytes is normal control flow, reported through
/// [`FrameParse::Incomplete`](crate::codec::FrameParse::Incomplete).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Byte at the expected frame-start offset is not the sync byte.
    #[error("Invalid sync byte: expected 0x55, got 0x{0:02X}")]
    InvalidSyncByte(u8),

    /// A CRC8 did not match its section.
    #[error("{segment} checksum mismatch: frame carries 0x{expected:02X}, computed 0x{computed:02X}")]
    ChecksumMismatch {
        segment: ChecksumSegment,
        /// Checksum byte carried in the frame.
        expected: u8,
        /// Checksum computed over the received bytes.
        computed: u8,
    },

    /// Packet-type byte is not recognized.
    #[error("Unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    /// Payload does not fit the frame's length fields.
    #[error("Frame too large: {0} bytes (max: {1})")]
    FrameTooLarge(usize, usize),

    /// Payload is structurally invalid for the declared packet type.
    #[error("Malformed payload: {0}")]
    MalformedPayload(&'static str),
}
