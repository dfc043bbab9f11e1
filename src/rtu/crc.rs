//! # Modbus CRC-16
//!
//! CRC-16/MODBUS from the `crc` crate: reflected polynomial 0xA001, initial
//! value 0xFFFF, no final XOR. The checksum is transmitted low byte first.

use crc::{Crc, CRC_16_MODBUS};

const MODBUS_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Computes the Modbus CRC-16 of `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    MODBUS_CRC.checksum(bytes)
}

/// Checks the trailing little-endian CRC of a complete frame.
///
/// Frames shorter than 3 bytes cannot carry a checksum over any data and are
/// rejected.
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let (body, tail) = frame.split_at(frame.len() - 2);
    crc16(body) == u16::from_le_bytes([tail[0], tail[1]])
}

/// CRC stored in the last two bytes of `frame`, if present.
pub fn stored_crc(frame: &[u8]) -> Option<u16> {
    match frame {
        [.., lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

/// CRC of `bytes` in transmission order (low byte first).
pub fn crc16_wire(bytes: &[u8]) -> [u8; 2] {
    crc16(bytes).to_le_bytes()
}

/// Appends the CRC of the current contents, low byte first.
pub fn append_crc(frame: &mut Vec<u8>) {
    let wire = crc16_wire(frame);
    frame.extend_from_slice(&wire);
}
