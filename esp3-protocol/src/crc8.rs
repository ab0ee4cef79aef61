//! ESP3 checksum support.
//!
//! ESP3 frames carry two CRC8 bytes, one over the 4-byte header and one
//! over the data plus optional-data payload. The algorithm is
//! CRC-8/SMBUS: polynomial 0x07, initial value 0x00, no reflection.

use crc::{Crc, CRC_8_SMBUS};

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Compute the CRC8 of `data`.
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}
