//! Typed packet model for the ESP3 packet kinds.
//!
//! A packet is immutable once constructed from a frame; building one from
//! field values always produces the canonical frame byte sequence, so
//! `parse(build(fields))` returns the original fields.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::eep::{EepTable, FieldValue};
use crate::error::ProtocolError;

/// Packet type identifiers carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketType {
    /// ERP1 radio telegram.
    RadioErp1 = 0x01,
    /// Command or telegram acknowledgement.
    Response = 0x02,
    /// Event notification from the local module.
    Event = 0x03,
    /// Common command addressed to the local module.
    CommonCommand = 0x04,
    /// ERP1 radio telegram, UTE framing variant. Teach-in is detected by
    /// the RORG byte inside the payload, not by this tag.
    RadioErp1Ute = 0x0A,
}

impl TryFrom<u8> for PacketType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0x01 => Ok(PacketType::RadioErp1),
            0x02 => Ok(PacketType::Response),
            0x03 => Ok(PacketType::Event),
            0x04 => Ok(PacketType::CommonCommand),
            0x0A => Ok(PacketType::RadioErp1Ute),
            other => Err(other),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(value: PacketType) -> Self {
        value as u8
    }
}

/// Radio-telegram organization (RORG) bytes.
pub mod rorg {
    /// Repeated switch communication (rocker switches).
    pub const RPS: u8 = 0xF6;
    /// 1-byte sensor communication.
    pub const BS1: u8 = 0xD5;
    /// 4-byte sensor communication.
    pub const BS4: u8 = 0xA5;
    /// Variable-length data.
    pub const VLD: u8 = 0xD2;
    /// Universal teach-in.
    pub const UTE: u8 = 0xD4;
}

/// Common command codes (data byte 0 of a COMMON_COMMAND packet).
pub mod common_command {
    /// Reset the module.
    pub const CO_WR_RESET: u8 = 0x02;
    /// Read the module version.
    pub const CO_RD_VERSION: u8 = 0x03;
    /// Read the module base ID.
    pub const CO_RD_IDBASE: u8 = 0x08;
}

/// Return code carried in the first data byte of a response packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnCode {
    Ok,
    Error,
    NotSupported,
    WrongParam,
    OperationDenied,
    /// Code outside the published set, preserved verbatim.
    Unrecognized(u8),
}

impl From<u8> for ReturnCode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => ReturnCode::Ok,
            0x01 => ReturnCode::Error,
            0x02 => ReturnCode::NotSupported,
            0x03 => ReturnCode::WrongParam,
            0x04 => ReturnCode::OperationDenied,
            other => ReturnCode::Unrecognized(other),
        }
    }
}

impl From<ReturnCode> for u8 {
    fn from(value: ReturnCode) -> Self {
        match value {
            ReturnCode::Ok => 0x00,
            ReturnCode::Error => 0x01,
            ReturnCode::NotSupported => 0x02,
            ReturnCode::WrongParam => 0x03,
            ReturnCode::OperationDenied => 0x04,
            ReturnCode::Unrecognized(other) => other,
        }
    }
}

impl ReturnCode {
    /// Returns true if this code reports success.
    pub fn is_ok(self) -> bool {
        self == ReturnCode::Ok
    }
}

/// The 4-byte address of the local radio transceiver module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseId(pub [u8; 4]);

impl fmt::Display for BaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}")
    }
}

/// UTE request type carried in bits 5-4 of the query's DB6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UteRequest {
    TeachIn,
    Deletion,
    TeachInOrDeletion,
    Reserved,
}

impl From<u8> for UteRequest {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0b00 => UteRequest::TeachIn,
            0b01 => UteRequest::Deletion,
            0b10 => UteRequest::TeachInOrDeletion,
            _ => UteRequest::Reserved,
        }
    }
}

/// A parsed ESP3 packet.
///
/// Closed sum over the packet kinds; every consumption site matches
/// exhaustively. The UTE teach-in variant is split out of the plain radio
/// variant so the teach-in handshake is visible in the type.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Data(DataPacket),
    Radio(RadioPacket),
    UteTeachIn(UteTeachInPacket),
    Response(ResponsePacket),
    Event(EventPacket),
}

impl Packet {
    /// Construct the typed packet for a validated frame.
    ///
    /// Dispatches on the packet-type tag; radio telegrams specialize to
    /// [`UteTeachInPacket`] when their RORG byte is the UTE value.
    pub fn from_frame(
        packet_type: PacketType,
        data: &[u8],
        optional: &[u8],
    ) -> Result<Packet, ProtocolError> {
        let data = Bytes::copy_from_slice(data);
        let optional = Bytes::copy_from_slice(optional);
        match packet_type {
            PacketType::RadioErp1 | PacketType::RadioErp1Ute => {
                let radio = RadioPacket::from_frame(packet_type, data, optional)?;
                if radio.rorg() == rorg::UTE {
                    Ok(Packet::UteTeachIn(UteTeachInPacket::from_radio(radio)?))
                } else {
                    Ok(Packet::Radio(radio))
                }
            }
            PacketType::Response => {
                Ok(Packet::Response(ResponsePacket::from_frame(data, optional)?))
            }
            PacketType::Event => Ok(Packet::Event(EventPacket::from_frame(data, optional)?)),
            PacketType::CommonCommand => Ok(Packet::Data(DataPacket {
                packet_type,
                data,
                optional,
                received: None,
            })),
        }
    }

    /// Serialize to the canonical frame byte sequence.
    pub fn to_bytes(&self) -> Result<Bytes, ProtocolError> {
        codec::encode_frame(self.packet_type(), self.data(), self.optional())
    }

    /// The packet-type tag from the frame header.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Data(p) => p.packet_type,
            Packet::Radio(p) => p.packet_type,
            Packet::UteTeachIn(p) => p.radio.packet_type,
            Packet::Response(p) => p.packet_type,
            Packet::Event(p) => p.packet_type,
        }
    }

    /// Raw data payload.
    pub fn data(&self) -> &[u8] {
        match self {
            Packet::Data(p) => &p.data,
            Packet::Radio(p) => &p.data,
            Packet::UteTeachIn(p) => &p.radio.data,
            Packet::Response(p) => &p.data,
            Packet::Event(p) => &p.data,
        }
    }

    /// Raw optional-data payload.
    pub fn optional(&self) -> &[u8] {
        match self {
            Packet::Data(p) => &p.optional,
            Packet::Radio(p) => &p.optional,
            Packet::UteTeachIn(p) => &p.radio.optional,
            Packet::Response(p) => &p.optional,
            Packet::Event(p) => &p.optional,
        }
    }

    /// Timestamp assigned by the session on receipt.
    pub fn received(&self) -> Option<DateTime<Utc>> {
        match self {
            Packet::Data(p) => p.received,
            Packet::Radio(p) => p.received,
            Packet::UteTeachIn(p) => p.radio.received,
            Packet::Response(p) => p.received,
            Packet::Event(p) => p.received,
        }
    }

    /// Record the receipt time. Write-once: later calls are ignored.
    pub fn stamp_received(&mut self, at: DateTime<Utc>) {
        let slot = match self {
            Packet::Data(p) => &mut p.received,
            Packet::Radio(p) => &mut p.received,
            Packet::UteTeachIn(p) => &mut p.radio.received,
            Packet::Response(p) => &mut p.received,
            Packet::Event(p) => &mut p.received,
        };
        if slot.is_none() {
            *slot = Some(at);
        }
    }
}

/// Generic packet container. No interpretation of the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPacket {
    packet_type: PacketType,
    data: Bytes,
    optional: Bytes,
    received: Option<DateTime<Utc>>,
}

impl DataPacket {
    pub fn new(packet_type: PacketType, data: &[u8], optional: &[u8]) -> Self {
        Self {
            packet_type,
            data: Bytes::copy_from_slice(data),
            optional: Bytes::copy_from_slice(optional),
            received: None,
        }
    }

    /// Build a common-command request (e.g. `CO_RD_IDBASE`).
    pub fn common_command(code: u8) -> Self {
        Self::new(PacketType::CommonCommand, &[code], &[])
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn optional(&self) -> &[u8] {
        &self.optional
    }

    pub fn received(&self) -> Option<DateTime<Utc>> {
        self.received
    }
}

/// ERP1 radio telegram.
///
/// Data layout: RORG byte, user data, 4-byte sender ID, status byte.
/// The 7-byte optional segment, when present, carries sub-telegram count,
/// destination ID, signal strength and security level.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioPacket {
    packet_type: PacketType,
    data: Bytes,
    optional: Bytes,
    received: Option<DateTime<Utc>>,
}

/// RORG + sender ID + status, with empty user data.
const MIN_ERP1_LEN: usize = 6;

/// Length of the ERP1 optional-data segment.
const ERP1_OPTIONAL_LEN: usize = 7;

impl RadioPacket {
    /// Build an outgoing telegram with the canonical send-side optional
    /// segment: 3 sub-telegrams, broadcast destination, dBm and security
    /// left at their transmit placeholders.
    pub fn erp1(rorg: u8, user_data: &[u8], sender: [u8; 4], status: u8) -> Self {
        let mut data = Vec::with_capacity(MIN_ERP1_LEN + user_data.len());
        data.push(rorg);
        data.extend_from_slice(user_data);
        data.extend_from_slice(&sender);
        data.push(status);
        Self {
            packet_type: PacketType::RadioErp1,
            data: data.into(),
            optional: Bytes::from_static(&[0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]),
            received: None,
        }
    }

    fn from_frame(
        packet_type: PacketType,
        data: Bytes,
        optional: Bytes,
    ) -> Result<Self, ProtocolError> {
        if data.len() < MIN_ERP1_LEN {
            return Err(ProtocolError::MalformedPayload(
                "radio telegram shorter than the minimal ERP1 layout",
            ));
        }
        Ok(Self {
            packet_type,
            data,
            optional,
            received: None,
        })
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn optional(&self) -> &[u8] {
        &self.optional
    }

    pub fn received(&self) -> Option<DateTime<Utc>> {
        self.received
    }

    /// Radio-telegram organization byte.
    pub fn rorg(&self) -> u8 {
        self.data[0]
    }

    /// The telegram's status byte.
    pub fn status(&self) -> u8 {
        self.data[self.data.len() - 1]
    }

    /// 4-byte sender address.
    pub fn sender_id(&self) -> [u8; 4] {
        let end = self.data.len() - 1;
        let mut id = [0u8; 4];
        id.copy_from_slice(&self.data[end - 4..end]);
        id
    }

    /// User data between the RORG byte and the sender ID.
    pub fn user_data(&self) -> &[u8] {
        &self.data[1..self.data.len() - 5]
    }

    /// Number of sub-telegrams, when the optional segment is present.
    pub fn subtelegram_count(&self) -> Option<u8> {
        self.erp1_optional().map(|opt| opt[0])
    }

    /// Destination address, when the optional segment is present.
    pub fn destination(&self) -> Option<[u8; 4]> {
        self.erp1_optional().map(|opt| {
            let mut id = [0u8; 4];
            id.copy_from_slice(&opt[1..5]);
            id
        })
    }

    /// Received signal strength in dBm (negated wire value).
    pub fn dbm(&self) -> Option<i16> {
        self.erp1_optional().map(|opt| -(i16::from(opt[5])))
    }

    /// Security level, when the optional segment is present.
    pub fn security_level(&self) -> Option<u8> {
        self.erp1_optional().map(|opt| opt[6])
    }

    /// Whether this telegram is a teach-in. For 1BS/4BS telegrams the
    /// learn bit is DB0 bit 3, cleared when teaching.
    pub fn teach_in(&self) -> bool {
        match self.rorg() {
            rorg::BS1 | rorg::BS4 => self
                .user_data()
                .last()
                .map_or(false, |db0| db0 & 0x08 == 0),
            rorg::UTE => true,
            _ => false,
        }
    }

    /// Decode the user data against a profile from `table`.
    ///
    /// Returns `None` when the table has no entry for this telegram's
    /// RORG and the given FUNC/TYPE: an unlisted profile is "unknown",
    /// not an error.
    pub fn decode_eep(&self, table: &EepTable, func: u8, ty: u8) -> Option<Vec<FieldValue>> {
        table
            .find(self.rorg(), func, ty)
            .map(|profile| profile.decode(self.user_data()))
    }

    fn erp1_optional(&self) -> Option<&[u8]> {
        if self.optional.len() == ERP1_OPTIONAL_LEN {
            Some(&self.optional)
        } else {
            None
        }
    }
}

/// Universal teach-in (UTE) handshake request.
///
/// A specialization of [`RadioPacket`] for RORG 0xD4. The 7 user-data
/// bytes are the query DB6..DB0: flag/command byte, channel count,
/// manufacturer ID, and the requested profile triple.
#[derive(Debug, Clone, PartialEq)]
pub struct UteTeachInPacket {
    radio: RadioPacket,
}

impl UteTeachInPacket {
    fn from_radio(radio: RadioPacket) -> Result<Self, ProtocolError> {
        if radio.data.len() < 13 {
            return Err(ProtocolError::MalformedPayload(
                "UTE telegram shorter than 13 bytes",
            ));
        }
        Ok(Self { radio })
    }

    /// The underlying radio telegram.
    pub fn radio(&self) -> &RadioPacket {
        &self.radio
    }

    pub fn sender_id(&self) -> [u8; 4] {
        self.radio.sender_id()
    }

    pub fn status(&self) -> u8 {
        self.radio.status()
    }

    /// Communication is unidirectional (DB6 bit 7 cleared).
    pub fn unidirectional(&self) -> bool {
        self.db6() & 0x80 == 0
    }

    /// The sender expects a teach-in response (DB6 bit 6 cleared).
    pub fn response_expected(&self) -> bool {
        self.db6() & 0x40 == 0
    }

    /// Teach-in, deletion, or either (DB6 bits 5-4).
    pub fn request_type(&self) -> UteRequest {
        UteRequest::from(self.db6() >> 4)
    }

    /// Command identifier (DB6 bits 3-0); 0 for a teach-in query.
    pub fn command(&self) -> u8 {
        self.db6() & 0x0F
    }

    /// Number of channels to be taught in.
    pub fn channels(&self) -> u8 {
        self.radio.data[2]
    }

    /// 11-bit manufacturer ID (DB4 low byte, DB3 bits 2-0 high).
    pub fn manufacturer_id(&self) -> u16 {
        u16::from(self.radio.data[4] & 0x07) << 8 | u16::from(self.radio.data[3])
    }

    /// The requested equipment profile as (RORG, FUNC, TYPE).
    pub fn eep(&self) -> (u8, u8, u8) {
        (self.radio.data[7], self.radio.data[6], self.radio.data[5])
    }

    /// Synthesize the teach-in-accepted reply.
    ///
    /// Pure: the reply depends only on this request and `base_id`, so
    /// identical inputs always give byte-identical output. DB6 of the
    /// reply sets the bidirectional bit, carries response code 0b01
    /// (request accepted) in bits 5-4 and command 0b0001 (teach-in
    /// response) in bits 3-0; the channel count, manufacturer ID and
    /// profile triple are echoed from the query; the sender ID becomes
    /// the base ID, and the optional segment addresses the requester.
    pub fn create_response_packet(&self, base_id: BaseId) -> RadioPacket {
        let mut data = Vec::with_capacity(13);
        data.push(rorg::UTE);
        data.push(0b1001_0001);
        data.extend_from_slice(&self.radio.data[2..8]);
        data.extend_from_slice(&base_id.0);
        data.push(0x00);

        let mut optional = Vec::with_capacity(ERP1_OPTIONAL_LEN);
        optional.push(0x03);
        optional.extend_from_slice(&self.sender_id());
        optional.push(0xFF);
        optional.push(0x00);

        RadioPacket {
            packet_type: PacketType::RadioErp1,
            data: data.into(),
            optional: optional.into(),
            received: None,
        }
    }

    fn db6(&self) -> u8 {
        self.radio.data[1]
    }
}

/// Command or telegram acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePacket {
    packet_type: PacketType,
    data: Bytes,
    optional: Bytes,
    received: Option<DateTime<Utc>>,
}

impl ResponsePacket {
    pub fn new(code: ReturnCode, response_data: &[u8]) -> Self {
        let mut data = Vec::with_capacity(1 + response_data.len());
        data.push(code.into());
        data.extend_from_slice(response_data);
        Self {
            packet_type: PacketType::Response,
            data: data.into(),
            optional: Bytes::new(),
            received: None,
        }
    }

    fn from_frame(data: Bytes, optional: Bytes) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::MalformedPayload(
                "response packet without a return code",
            ));
        }
        Ok(Self {
            packet_type: PacketType::Response,
            data,
            optional,
            received: None,
        })
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn response_code(&self) -> ReturnCode {
        ReturnCode::from(self.data[0])
    }

    /// Payload after the return code. The CO_RD_IDBASE acknowledgement
    /// carries the 4-byte base ID here.
    pub fn response_data(&self) -> &[u8] {
        &self.data[1..]
    }

    pub fn received(&self) -> Option<DateTime<Utc>> {
        self.received
    }
}

/// Event notification from the local module.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPacket {
    packet_type: PacketType,
    data: Bytes,
    optional: Bytes,
    received: Option<DateTime<Utc>>,
}

impl EventPacket {
    pub fn new(event_code: u8) -> Self {
        Self {
            packet_type: PacketType::Event,
            data: Bytes::copy_from_slice(&[event_code]),
            optional: Bytes::new(),
            received: None,
        }
    }

    fn from_frame(data: Bytes, optional: Bytes) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::MalformedPayload(
                "event packet without an event code",
            ));
        }
        Ok(Self {
            packet_type: PacketType::Event,
            data,
            optional,
            received: None,
        })
    }

    pub fn event_code(&self) -> u8 {
        self.data[0]
    }

    pub fn received(&self) -> Option<DateTime<Utc>> {
        self.received
    }
}
