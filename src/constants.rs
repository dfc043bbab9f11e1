//! Modbus RTU Protocol Constants
//!
//! This module defines constants used by the Modbus RTU master, the register
//! decoder and the acquisition layer.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Function codes
// ----------------------------------------------------------------------------

pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Set in the function byte of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ----------------------------------------------------------------------------
// Frame limits
// ----------------------------------------------------------------------------

/// Largest RTU frame on the wire (address + PDU + CRC)
pub const MAX_FRAME_SIZE: usize = 256;

/// Read request frame length
pub const READ_REQUEST_LEN: usize = 8;

/// Header bytes of a write-multiple request before the register values
pub const WRITE_MULTIPLE_HEADER_LEN: usize = 7;

pub const CRC_LEN: usize = 2;

/// Shortest frame that can carry a response (exception response length)
pub const MIN_RESPONSE_LEN: usize = 5;

/// Shortest non-exception response to a write request
pub const MIN_WRITE_RESPONSE_LEN: usize = 8;

/// Maximum registers per read (0x03/0x04)
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum registers per write-multiple (0x10)
pub const MAX_WRITE_REGISTERS: u16 = 123;

// ----------------------------------------------------------------------------
// Timing
// ----------------------------------------------------------------------------

/// Fixed response window for one exchange
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Shortest line silence that ends a received frame. USB adapters deliver
/// bytes in bursts, so the 3.5 character gap alone would split frames.
pub const FRAME_GAP_FLOOR: Duration = Duration::from_millis(20);

/// Upper bound for the port to drain its transmit buffer
pub const TX_DONE_TIMEOUT: Duration = Duration::from_millis(100);

/// Pause after a bit-rate change before the bus is used again
pub const BAUD_SETTLE_TIME: Duration = Duration::from_millis(50);

// ----------------------------------------------------------------------------
// Acquisition
// ----------------------------------------------------------------------------

/// Sub-channels a single sensor profile may carry
pub const MAX_SUB_CHANNELS: usize = 8;

/// Register span read for vendor composite families
pub const VENDOR_REGISTER_SPAN: usize = 4;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
