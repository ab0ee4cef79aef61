//! Frame-level codec for ESP3.
//!
//! Frame format:
//! ```text
//! +------+-------------+---------+----------+-------+--------+----------+-------+
//! | Sync | Data length | Opt len | Pkt type | CRC8H |  Data  | Optional | CRC8D |
//! | 0x55 | u16 BE      | u8      | u8       | 1 B   | var    | var      | 1 B   |
//! +------+-------------+---------+----------+-------+--------+----------+-------+
//! ```
//!
//! CRC8H covers the four header bytes; CRC8D covers data plus optional
//! data. A frame is complete only when the declared total length has
//! arrived and both checksums validate.

use bytes::{BufMut, Bytes, BytesMut};

use crate::crc8::crc8;
use crate::error::{ChecksumSegment, ProtocolError};
use crate::packet::{Packet, PacketType};

/// Frame synchronization byte.
pub const SYNC_BYTE: u8 = 0x55;

/// Sync (1) + data length (2) + optional length (1) + packet type (1) +
/// header CRC8 (1).
pub const HEADER_SIZE: usize = 6;

/// Maximum data payload length (16-bit length field).
pub const MAX_DATA_SIZE: usize = u16::MAX as usize;

/// Maximum optional payload length (8-bit length field).
pub const MAX_OPTIONAL_SIZE: usize = u8::MAX as usize;

/// Outcome of one parse attempt over the front of a byte buffer.
///
/// The parser never consumes input itself. `consumed` and `skip` tell the
/// caller how many bytes to drain from the front of the buffer; whether
/// and how to resynchronize after an invalid frame is the caller's
/// decision.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameParse {
    /// Not enough bytes for a complete frame; `needed` is the minimum
    /// number of further bytes before another attempt can succeed.
    Incomplete { needed: usize },
    /// A complete, checksum-valid frame. Drain `consumed` bytes.
    Parsed { packet: Packet, consumed: usize },
    /// The framing is present but the frame is unusable. `skip` is the
    /// number of bytes known not to contain a frame start: the whole
    /// declared frame when the header validated, otherwise just the sync
    /// byte (the length fields cannot be trusted).
    Invalid { reason: ProtocolError, skip: usize },
}

/// Extract one frame from the front of `buf`.
///
/// Only offset 0 is ever treated as a sync position; a 0x55 inside
/// payload data is never re-interpreted as a frame start. Zero-length
/// data and optional segments are legal.
pub fn parse_frame(buf: &[u8]) -> FrameParse {
    if buf.is_empty() {
        return FrameParse::Incomplete { needed: HEADER_SIZE };
    }
    if buf[0] != SYNC_BYTE {
        return FrameParse::Invalid {
            reason: ProtocolError::InvalidSyncByte(buf[0]),
            skip: 1,
        };
    }
    if buf.len() < HEADER_SIZE {
        return FrameParse::Incomplete {
            needed: HEADER_SIZE - buf.len(),
        };
    }

    let data_len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
    let optional_len = buf[3] as usize;
    let total = HEADER_SIZE + data_len + optional_len + 1;
    if buf.len() < total {
        return FrameParse::Incomplete {
            needed: total - buf.len(),
        };
    }

    let header_crc = crc8(&buf[1..5]);
    if header_crc != buf[5] {
        return FrameParse::Invalid {
            reason: ProtocolError::ChecksumMismatch {
                segment: ChecksumSegment::Header,
                expected: buf[5],
                computed: header_crc,
            },
            skip: 1,
        };
    }

    let payload = &buf[HEADER_SIZE..total - 1];
    let payload_crc = crc8(payload);
    if payload_crc != buf[total - 1] {
        return FrameParse::Invalid {
            reason: ProtocolError::ChecksumMismatch {
                segment: ChecksumSegment::Data,
                expected: buf[total - 1],
                computed: payload_crc,
            },
            skip: total,
        };
    }

    let packet_type = match PacketType::try_from(buf[4]) {
        Ok(packet_type) => packet_type,
        Err(raw) => {
            return FrameParse::Invalid {
                reason: ProtocolError::UnknownPacketType(raw),
                skip: total,
            }
        }
    };

    match Packet::from_frame(packet_type, &payload[..data_len], &payload[data_len..]) {
        Ok(packet) => FrameParse::Parsed {
            packet,
            consumed: total,
        },
        Err(reason) => FrameParse::Invalid {
            reason,
            skip: total,
        },
    }
}

/// Build the canonical frame byte sequence for a payload.
pub fn encode_frame(
    packet_type: PacketType,
    data: &[u8],
    optional: &[u8],
) -> Result<Bytes, ProtocolError> {
    if data.len() > MAX_DATA_SIZE {
        return Err(ProtocolError::FrameTooLarge(data.len(), MAX_DATA_SIZE));
    }
    if optional.len() > MAX_OPTIONAL_SIZE {
        return Err(ProtocolError::FrameTooLarge(
            optional.len(),
            MAX_OPTIONAL_SIZE,
        ));
    }

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + data.len() + optional.len() + 1);
    frame.put_u8(SYNC_BYTE);
    frame.put_u16(data.len() as u16);
    frame.put_u8(optional.len() as u8);
    frame.put_u8(packet_type.into());
    let header_crc = crc8(&frame[1..5]);
    frame.put_u8(header_crc);
    frame.put_slice(data);
    frame.put_slice(optional);
    let payload_crc = crc8(&frame[HEADER_SIZE..]);
    frame.put_u8(payload_crc);
    Ok(frame.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{common_command, rorg, DataPacket, EventPacket, RadioPacket, ResponsePacket, ReturnCode};

    /// CO_RD_IDBASE request: data_length 1, no optional data, type 0x04.
    const READ_BASE_ID_FRAME: [u8; 8] = [0x55, 0x00, 0x01, 0x00, 0x04, 0x77, 0x08, 0x38];

    fn raw_frame(packet_type: u8, data: &[u8], optional: &[u8]) -> Vec<u8> {
        let mut frame = vec![SYNC_BYTE];
        frame.extend_from_slice(&(data.len() as u16).to_be_bytes());
        frame.push(optional.len() as u8);
        frame.push(packet_type);
        frame.push(crc8(&frame[1..5]));
        frame.extend_from_slice(data);
        frame.extend_from_slice(optional);
        frame.push(crc8(&frame[HEADER_SIZE..]));
        frame
    }

    #[test]
    fn parses_the_read_base_id_command_frame() {
        match parse_frame(&READ_BASE_ID_FRAME) {
            FrameParse::Parsed { packet, consumed } => {
                assert_eq!(consumed, READ_BASE_ID_FRAME.len());
                assert_eq!(packet.packet_type(), PacketType::CommonCommand);
                assert_eq!(packet.data(), &[common_command::CO_RD_IDBASE]);
                assert!(packet.optional().is_empty());
                assert!(matches!(packet, Packet::Data(_)));
                assert_eq!(packet.received(), None);
            }
            other => panic!("expected a parsed frame, got {other:?}"),
        }
    }

    #[test]
    fn encode_produces_the_canonical_frame() {
        let frame =
            encode_frame(PacketType::CommonCommand, &[common_command::CO_RD_IDBASE], &[]).unwrap();
        assert_eq!(&frame[..], &READ_BASE_ID_FRAME[..]);
    }

    #[test]
    fn incomplete_at_every_prefix() {
        for len in 0..READ_BASE_ID_FRAME.len() {
            match parse_frame(&READ_BASE_ID_FRAME[..len]) {
                FrameParse::Incomplete { needed } => {
                    assert!(needed > 0);
                    assert!(len + needed <= READ_BASE_ID_FRAME.len());
                }
                other => panic!("prefix of {len} bytes must be incomplete, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_buffer_is_incomplete() {
        assert_eq!(
            parse_frame(&[]),
            FrameParse::Incomplete { needed: HEADER_SIZE }
        );
    }

    #[test]
    fn bad_sync_byte_is_invalid() {
        match parse_frame(&[0xAA, 0x00, 0x01]) {
            FrameParse::Invalid {
                reason: ProtocolError::InvalidSyncByte(0xAA),
                skip: 1,
            } => {}
            other => panic!("expected an invalid sync byte, got {other:?}"),
        }
    }

    #[test]
    fn bit_flips_fail_a_checksum() {
        // Type byte, header CRC, data byte, data CRC.
        for idx in [4, 5, 6, 7] {
            let mut frame = READ_BASE_ID_FRAME;
            frame[idx] ^= 0x01;
            match parse_frame(&frame) {
                FrameParse::Invalid {
                    reason: ProtocolError::ChecksumMismatch { .. },
                    ..
                } => {}
                other => panic!("flip at byte {idx} must fail a checksum, got {other:?}"),
            }
        }
    }

    #[test]
    fn header_corruption_skips_only_the_sync_byte() {
        let mut frame = READ_BASE_ID_FRAME;
        frame[5] ^= 0xFF;
        match parse_frame(&frame) {
            FrameParse::Invalid { skip, reason } => {
                assert_eq!(skip, 1);
                assert!(matches!(
                    reason,
                    ProtocolError::ChecksumMismatch {
                        segment: ChecksumSegment::Header,
                        ..
                    }
                ));
            }
            other => panic!("expected an invalid frame, got {other:?}"),
        }
    }

    #[test]
    fn payload_corruption_skips_the_whole_frame() {
        let mut frame = READ_BASE_ID_FRAME;
        frame[7] ^= 0xFF;
        match parse_frame(&frame) {
            FrameParse::Invalid { skip, reason } => {
                assert_eq!(skip, frame.len());
                assert!(matches!(
                    reason,
                    ProtocolError::ChecksumMismatch {
                        segment: ChecksumSegment::Data,
                        ..
                    }
                ));
            }
            other => panic!("expected an invalid frame, got {other:?}"),
        }
    }

    #[test]
    fn unknown_packet_type_is_invalid() {
        let frame = raw_frame(0x7F, &[0x01], &[]);
        match parse_frame(&frame) {
            FrameParse::Invalid {
                reason: ProtocolError::UnknownPacketType(0x7F),
                skip,
            } => assert_eq!(skip, frame.len()),
            other => panic!("expected an unknown packet type, got {other:?}"),
        }
    }

    #[test]
    fn sync_byte_inside_payload_is_not_a_frame_start() {
        let packet = Packet::Radio(RadioPacket::erp1(
            rorg::BS4,
            &[0x55, 0x55, 0x55, 0x08],
            [0x55, 0x55, 0x55, 0x55],
            0x00,
        ));
        let frame = packet.to_bytes().unwrap();
        match parse_frame(&frame) {
            FrameParse::Parsed { packet: parsed, consumed } => {
                assert_eq!(consumed, frame.len());
                assert_eq!(parsed, packet);
            }
            other => panic!("expected a parsed frame, got {other:?}"),
        }
    }

    #[test]
    fn drained_buffer_finds_the_next_frame() {
        let first =
            encode_frame(PacketType::CommonCommand, &[common_command::CO_RD_IDBASE], &[]).unwrap();
        let second =
            encode_frame(PacketType::Response, &[0x00, 0x12, 0x34, 0x56, 0x78], &[]).unwrap();
        let mut buf = Vec::new();
        buf.extend_from_slice(&first);
        buf.extend_from_slice(&second);
        buf.extend_from_slice(&second[..4]);

        let consumed = match parse_frame(&buf) {
            FrameParse::Parsed { consumed, .. } => consumed,
            other => panic!("expected the first frame, got {other:?}"),
        };
        assert_eq!(consumed, first.len());

        let rest = &buf[consumed..];
        let consumed = match parse_frame(rest) {
            FrameParse::Parsed { packet, consumed } => {
                assert!(matches!(packet, Packet::Response(_)));
                consumed
            }
            other => panic!("expected the second frame, got {other:?}"),
        };
        assert_eq!(consumed, second.len());

        assert!(matches!(
            parse_frame(&rest[consumed..]),
            FrameParse::Incomplete { .. }
        ));
    }

    #[test]
    fn zero_length_payloads_are_legal() {
        let frame = raw_frame(PacketType::CommonCommand as u8, &[], &[]);
        match parse_frame(&frame) {
            FrameParse::Parsed { packet, consumed } => {
                assert_eq!(consumed, HEADER_SIZE + 1);
                assert!(packet.data().is_empty());
                assert!(packet.optional().is_empty());
            }
            other => panic!("expected a parsed frame, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_every_packet_kind() {
        let packets = [
            Packet::Data(DataPacket::common_command(common_command::CO_RD_IDBASE)),
            Packet::Data(DataPacket::new(PacketType::CommonCommand, &[0x03], &[0x01])),
            Packet::Response(ResponsePacket::new(ReturnCode::Ok, &[0x12, 0x34, 0x56, 0x78])),
            Packet::Event(EventPacket::new(0x04)),
            Packet::Radio(RadioPacket::erp1(
                rorg::RPS,
                &[0x50],
                [0x01, 0x02, 0x03, 0x04],
                0x30,
            )),
        ];
        for packet in packets {
            let frame = packet.to_bytes().unwrap();
            match parse_frame(&frame) {
                FrameParse::Parsed { packet: parsed, consumed } => {
                    assert_eq!(consumed, frame.len());
                    assert_eq!(parsed, packet);
                }
                other => panic!("round trip failed for {packet:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn ute_telegram_round_trips_as_teach_in() {
        let radio = RadioPacket::erp1(
            rorg::UTE,
            &[0b1000_0000, 0x01, 0x46, 0x00, 0x05, 0x02, 0xA5],
            [0xAA, 0xBB, 0xCC, 0xDD],
            0x00,
        );
        let frame = encode_frame(radio.packet_type(), radio.data(), radio.optional()).unwrap();
        match parse_frame(&frame) {
            FrameParse::Parsed { packet: Packet::UteTeachIn(parsed), .. } => {
                assert_eq!(parsed.radio(), &radio);
                assert_eq!(parsed.eep(), (0xA5, 0x02, 0x05));
            }
            other => panic!("expected a teach-in packet, got {other:?}"),
        }
    }

    #[test]
    fn oversize_payloads_are_rejected() {
        let data = vec![0u8; MAX_DATA_SIZE + 1];
        assert!(matches!(
            encode_frame(PacketType::CommonCommand, &data, &[]),
            Err(ProtocolError::FrameTooLarge(_, MAX_DATA_SIZE))
        ));
        let optional = vec![0u8; MAX_OPTIONAL_SIZE + 1];
        assert!(matches!(
            encode_frame(PacketType::CommonCommand, &[], &optional),
            Err(ProtocolError::FrameTooLarge(_, MAX_OPTIONAL_SIZE))
        ));
    }
}
