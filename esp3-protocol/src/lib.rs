//! EnOcean Serial Protocol 3 (ESP3) definitions.
//!
//! This crate defines the byte-level frame codec and the typed packet
//! model used to talk to an EnOcean radio module over a serial line or
//! any other duplex byte stream. It performs no I/O: feeding it bytes and
//! shipping its frames is the job of a session layer such as `esp3-link`.
//!
//! # Frame Format
//!
//! ```text
//! +------+-------------+---------+----------+-------+--------+----------+-------+
//! | Sync | Data length | Opt len | Pkt type | CRC8H |  Data  | Optional | CRC8D |
//! | 0x55 | u16 BE      | u8      | u8       | 1 B   | var    | var      | 1 B   |
//! +------+-------------+---------+----------+-------+--------+----------+-------+
//! ```
//!
//! # Example
//!
//! ```rust
//! use esp3_protocol::{encode_frame, parse_frame, FrameParse, PacketType};
//!
//! // Encode a read-base-ID command frame.
//! let frame = encode_frame(PacketType::CommonCommand, &[0x08], &[]).unwrap();
//!
//! // Parse it back.
//! match parse_frame(&frame) {
//!     FrameParse::Parsed { packet, consumed } => {
//!         assert_eq!(consumed, frame.len());
//!         assert_eq!(packet.packet_type(), PacketType::CommonCommand);
//!     }
//!     other => panic!("unexpected parse outcome: {other:?}"),
//! }
//! ```
//!
//! # Equipment Profiles
//!
//! Radio telegrams carry sensor data whose bit layout is fixed by an EEP
//! (RORG, FUNC, TYPE) triple. [`EepTable`] is a static lookup passed
//! explicitly to [`RadioPacket::decode_eep`]:
//!
//! ```rust
//! use esp3_protocol::{rorg, EepTable, RadioPacket};
//!
//! let table = EepTable::builtin();
//! let telegram = RadioPacket::erp1(rorg::BS4, &[0x00, 0x00, 0x7F, 0x08], [1, 2, 3, 4], 0);
//! let fields = telegram.decode_eep(&table, 0x02, 0x05).unwrap();
//! assert_eq!(fields[0].name, "TMP");
//! ```

pub mod codec;
pub mod crc8;
pub mod eep;
pub mod error;
pub mod packet;

pub use codec::{
    encode_frame, parse_frame, FrameParse, HEADER_SIZE, MAX_DATA_SIZE, MAX_OPTIONAL_SIZE,
    SYNC_BYTE,
};
pub use crc8::crc8;
pub use eep::{EepTable, FieldRule, FieldValue, Profile, Scaling};
pub use error::{ChecksumSegment, ProtocolError};
pub use packet::{
    common_command, rorg, BaseId, DataPacket, EventPacket, Packet, PacketType, RadioPacket,
    ResponsePacket, ReturnCode, UteRequest, UteTeachInPacket,
};
