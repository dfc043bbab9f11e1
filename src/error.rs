//! # RTU Error Handling
//!
//! This module defines the RtuError enum, which represents the different error
//! types that can occur in the rtu-telemetry crate, and the coarse
//! [`ErrorCategory`] used by the exchange statistics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents the different error types that can occur in the RTU crate.
#[derive(Debug, Error)]
pub enum RtuError {
    /// No bytes arrived within the response window.
    #[error("Timeout waiting for response")]
    Timeout,

    /// The response checksum did not match its contents.
    #[error("Invalid CRC: expected 0x{expected:04X}, calculated 0x{calculated:04X}")]
    InvalidCrc { expected: u16, calculated: u16 },

    /// The device answered with a Modbus exception; the code is passed through verbatim.
    #[error("Protocol exception 0x{0:02X}")]
    ProtocolException(u8),

    /// Short frame, header mismatch or echoed-field mismatch.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The caller supplied an unsupported or out-of-range argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The transport port was never opened or has been closed.
    #[error("Transport port not open")]
    PortNotOpen,

    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// Gateway configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RtuError {
    /// Statistics bucket this error is counted under.
    pub fn category(&self) -> ErrorCategory {
        match self {
            RtuError::Timeout => ErrorCategory::Timeout,
            RtuError::InvalidCrc { .. } => ErrorCategory::InvalidCrc,
            RtuError::ProtocolException(code) => ErrorCategory::ProtocolException(*code),
            RtuError::MalformedResponse(_) => ErrorCategory::MalformedResponse,
            RtuError::InvalidArgument(_) | RtuError::Config(_) => ErrorCategory::InvalidArgument,
            RtuError::PortNotOpen | RtuError::SerialPortError(_) => ErrorCategory::Transport,
        }
    }
}

impl From<std::io::Error> for RtuError {
    fn from(e: std::io::Error) -> Self {
        RtuError::SerialPortError(e.to_string())
    }
}

impl From<tokio_serial::Error> for RtuError {
    fn from(e: tokio_serial::Error) -> Self {
        RtuError::SerialPortError(e.to_string())
    }
}

impl From<serde_json::Error> for RtuError {
    fn from(e: serde_json::Error) -> Self {
        RtuError::Config(e.to_string())
    }
}

/// Failure buckets tracked by the exchange statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    Timeout,
    InvalidCrc,
    ProtocolException(u8),
    MalformedResponse,
    InvalidArgument,
    Transport,
}

/// Result of a single request/response cycle.
pub type ExchangeResult<T> = Result<T, RtuError>;
