//! # Modbus RTU Frame Codec
//!
//! This module builds outbound request frames and validates inbound response
//! frames. Response bodies are decoded with the `nom` crate; request frames
//! are assembled with `bytes::BufMut`.
//!
//! ## Wire formats
//!
//! ```text
//! read request     [slave][fc][addr_hi][addr_lo][qty_hi][qty_lo][crc_lo][crc_hi]
//! read response    [slave][fc][byte_count][data...][crc_lo][crc_hi]
//! write single     [slave][0x06][addr_hi][addr_lo][val_hi][val_lo][crc_lo][crc_hi]
//! write multiple   [slave][0x10][addr_hi][addr_lo][qty_hi][qty_lo][byte_count][values...]
//!                  [crc_lo][crc_hi]
//! exception        [slave][fc|0x80][exception_code][crc_lo][crc_hi]
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let request = build_read(0x01, FC_READ_HOLDING_REGISTERS, 0x0000, 2)?;
//! port.write(request.as_bytes()).await?;
//! let raw = port.read(64, RESPONSE_TIMEOUT).await?;
//! match parse_response(&raw, 0x01, FC_READ_HOLDING_REGISTERS)? {
//!     ResponsePdu::Registers(words) => { /* decode words */ }
//!     _ => unreachable!(),
//! }
//! ```

use crate::constants::{
    CRC_LEN, EXCEPTION_FLAG, FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS,
    FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER, MAX_FRAME_SIZE, MAX_READ_REGISTERS,
    MAX_WRITE_REGISTERS, MIN_RESPONSE_LEN, READ_REQUEST_LEN, WRITE_MULTIPLE_HEADER_LEN,
};
use crate::error::RtuError;
use crate::rtu::crc;
use bytes::BufMut;
use nom::combinator::all_consuming;
use nom::multi::{count, length_data};
use nom::number::complete::{be_u16, be_u8};
use nom::sequence::pair;
use nom::IResult;
use std::fmt;

/// An encoded request, CRC included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFrame(Vec<u8>);

impl RegisterFrame {
    /// Wraps `body` and appends its CRC.
    fn seal(mut body: Vec<u8>) -> Self {
        crc::append_crc(&mut body);
        RegisterFrame(body)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn slave_id(&self) -> u8 {
        self.0[0]
    }

    pub fn function_code(&self) -> u8 {
        self.0[1]
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for RegisterFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Validated body of a response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePdu {
    /// Register words of a 0x03/0x04 response, in wire order.
    Registers(Vec<u16>),
    /// Echo of a 0x06 request.
    WriteSingle { address: u16, value: u16 },
    /// Echo of a 0x10 request.
    WriteMultiple { start: u16, quantity: u16 },
}

/// Standard Modbus exception codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    Other(u8),
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::ServerDeviceFailure,
            0x05 => ExceptionCode::Acknowledge,
            0x06 => ExceptionCode::ServerDeviceBusy,
            0x08 => ExceptionCode::MemoryParityError,
            0x0A => ExceptionCode::GatewayPathUnavailable,
            0x0B => ExceptionCode::GatewayTargetFailedToRespond,
            other => ExceptionCode::Other(other),
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExceptionCode::IllegalFunction => "illegal function",
            ExceptionCode::IllegalDataAddress => "illegal data address",
            ExceptionCode::IllegalDataValue => "illegal data value",
            ExceptionCode::ServerDeviceFailure => "server device failure",
            ExceptionCode::Acknowledge => "acknowledge",
            ExceptionCode::ServerDeviceBusy => "server device busy",
            ExceptionCode::MemoryParityError => "memory parity error",
            ExceptionCode::GatewayPathUnavailable => "gateway path unavailable",
            ExceptionCode::GatewayTargetFailedToRespond => "gateway target failed to respond",
            ExceptionCode::Other(code) => return write!(f, "exception 0x{code:02X}"),
        };
        f.write_str(text)
    }
}

/// Builds an 8-byte read request for holding (0x03) or input (0x04) registers.
pub fn build_read(
    slave_id: u8,
    function_code: u8,
    start_addr: u16,
    quantity: u16,
) -> Result<RegisterFrame, RtuError> {
    if function_code != FC_READ_HOLDING_REGISTERS && function_code != FC_READ_INPUT_REGISTERS {
        return Err(RtuError::InvalidArgument(format!(
            "function code 0x{function_code:02X} is not a register read"
        )));
    }
    if quantity == 0 || quantity > MAX_READ_REGISTERS {
        return Err(RtuError::InvalidArgument(format!(
            "read quantity {quantity} outside 1..={MAX_READ_REGISTERS}"
        )));
    }

    let mut body = Vec::with_capacity(READ_REQUEST_LEN);
    body.put_u8(slave_id);
    body.put_u8(function_code);
    body.put_u16(start_addr);
    body.put_u16(quantity);
    Ok(RegisterFrame::seal(body))
}

/// Builds an 8-byte write-single-register request.
pub fn build_write_single(slave_id: u8, address: u16, value: u16) -> RegisterFrame {
    let mut body = Vec::with_capacity(READ_REQUEST_LEN);
    body.put_u8(slave_id);
    body.put_u8(FC_WRITE_SINGLE_REGISTER);
    body.put_u16(address);
    body.put_u16(value);
    RegisterFrame::seal(body)
}

/// Builds a write-multiple-registers request of `7 + 2*N + 2` bytes.
pub fn build_write_multiple(
    slave_id: u8,
    start_addr: u16,
    values: &[u16],
) -> Result<RegisterFrame, RtuError> {
    if values.is_empty() {
        return Err(RtuError::InvalidArgument("no register values to write".into()));
    }
    if values.len() > usize::from(MAX_WRITE_REGISTERS) {
        return Err(RtuError::InvalidArgument(format!(
            "{} registers exceed the write limit of {MAX_WRITE_REGISTERS}",
            values.len()
        )));
    }
    let frame_len = WRITE_MULTIPLE_HEADER_LEN + 2 * values.len() + CRC_LEN;
    if frame_len > MAX_FRAME_SIZE {
        return Err(RtuError::InvalidArgument(format!(
            "write frame of {frame_len} bytes exceeds {MAX_FRAME_SIZE}"
        )));
    }

    let mut body = Vec::with_capacity(frame_len);
    body.put_u8(slave_id);
    body.put_u8(FC_WRITE_MULTIPLE_REGISTERS);
    body.put_u16(start_addr);
    body.put_u16(values.len() as u16);
    body.put_u8((values.len() * 2) as u8);
    for value in values {
        body.put_u16(*value);
    }
    Ok(RegisterFrame::seal(body))
}

/// Validates a raw response and extracts its body.
///
/// Checks run in a fixed order: minimum length, CRC, exception flag, header
/// match, then the function-specific body.
pub fn parse_response(
    raw: &[u8],
    expected_slave: u8,
    expected_function: u8,
) -> Result<ResponsePdu, RtuError> {
    if raw.len() < MIN_RESPONSE_LEN {
        return Err(RtuError::MalformedResponse(format!(
            "{} bytes is shorter than the minimum response",
            raw.len()
        )));
    }

    if !crc::verify(raw) {
        let body = &raw[..raw.len() - CRC_LEN];
        return Err(RtuError::InvalidCrc {
            expected: crc::stored_crc(raw).unwrap_or_default(),
            calculated: crc::crc16(body),
        });
    }

    let (slave, function) = (raw[0], raw[1]);
    if function & EXCEPTION_FLAG != 0 {
        return Err(RtuError::ProtocolException(raw[2]));
    }
    if slave != expected_slave {
        return Err(RtuError::MalformedResponse(format!(
            "slave id 0x{slave:02X} does not match request 0x{expected_slave:02X}"
        )));
    }
    if function != expected_function {
        return Err(RtuError::MalformedResponse(format!(
            "function code 0x{function:02X} does not match request 0x{expected_function:02X}"
        )));
    }

    let body = &raw[2..raw.len() - CRC_LEN];
    let parsed = match function {
        FC_READ_HOLDING_REGISTERS | FC_READ_INPUT_REGISTERS => {
            if body[0] % 2 != 0 {
                return Err(RtuError::MalformedResponse(format!(
                    "odd byte count {}",
                    body[0]
                )));
            }
            all_consuming(parse_register_body)(body).map(|(_, words)| ResponsePdu::Registers(words))
        }
        FC_WRITE_SINGLE_REGISTER => all_consuming(parse_echo)(body)
            .map(|(_, (address, value))| ResponsePdu::WriteSingle { address, value }),
        FC_WRITE_MULTIPLE_REGISTERS => all_consuming(parse_echo)(body)
            .map(|(_, (start, quantity))| ResponsePdu::WriteMultiple { start, quantity }),
        other => {
            return Err(RtuError::InvalidArgument(format!(
                "unsupported function code 0x{other:02X}"
            )))
        }
    };

    parsed.map_err(|e| RtuError::MalformedResponse(format!("response body: {e:?}")))
}

/// `[byte_count][data...]` into big-endian words.
fn parse_register_body(input: &[u8]) -> IResult<&[u8], Vec<u16>> {
    let (input, data) = length_data(be_u8)(input)?;
    let (_, words) = count(be_u16, data.len() / 2)(data)?;
    Ok((input, words))
}

/// Address plus value/quantity echoed by write responses.
fn parse_echo(input: &[u8]) -> IResult<&[u8], (u16, u16)> {
    pair(be_u16, be_u16)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_read_reference_frame() {
        let frame = build_read(0x01, FC_READ_HOLDING_REGISTERS, 0x0000, 2).unwrap();
        assert_eq!(
            frame.as_bytes(),
            &[0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B]
        );
        assert_eq!(frame.slave_id(), 0x01);
        assert_eq!(frame.function_code(), 0x03);
    }

    #[test]
    fn test_build_read_rejects_write_function() {
        assert!(matches!(
            build_read(0x01, FC_WRITE_SINGLE_REGISTER, 0, 1),
            Err(RtuError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_build_read_quantity_bounds() {
        assert!(build_read(0x01, FC_READ_INPUT_REGISTERS, 0, 0).is_err());
        assert!(build_read(0x01, FC_READ_INPUT_REGISTERS, 0, 126).is_err());
        assert!(build_read(0x01, FC_READ_INPUT_REGISTERS, 0, 125).is_ok());
    }

    #[test]
    fn test_build_write_multiple_layout() {
        let frame = build_write_multiple(0x11, 0x0001, &[0x000A, 0x0102]).unwrap();
        assert_eq!(frame.len(), 7 + 4 + 2);
        assert_eq!(
            &frame.as_bytes()[..11],
            &[0x11, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
        );
        assert!(crc::verify(frame.as_bytes()));
    }

    #[test]
    fn test_build_write_multiple_limits() {
        assert!(matches!(
            build_write_multiple(1, 0, &[]),
            Err(RtuError::InvalidArgument(_))
        ));
        let too_many = vec![0u16; usize::from(MAX_WRITE_REGISTERS) + 1];
        assert!(matches!(
            build_write_multiple(1, 0, &too_many),
            Err(RtuError::InvalidArgument(_))
        ));
        let max = vec![0u16; usize::from(MAX_WRITE_REGISTERS)];
        assert_eq!(build_write_multiple(1, 0, &max).unwrap().len(), 255);
    }

    #[test]
    fn test_parse_register_response() {
        let mut raw = vec![0x01, 0x03, 0x04, 0x12, 0x34, 0x56, 0x78];
        crc::append_crc(&mut raw);
        let pdu = parse_response(&raw, 0x01, 0x03).unwrap();
        assert_eq!(pdu, ResponsePdu::Registers(vec![0x1234, 0x5678]));
    }

    #[test]
    fn test_parse_exception_before_header_check() {
        let mut raw = vec![0x07, 0x83, 0x02];
        crc::append_crc(&mut raw);
        // Slave mismatch is not reported: the exception flag wins.
        assert!(matches!(
            parse_response(&raw, 0x01, 0x03),
            Err(RtuError::ProtocolException(0x02))
        ));
    }

    #[test]
    fn test_parse_byte_count_overrun() {
        let mut raw = vec![0x01, 0x03, 0x06, 0x12, 0x34];
        crc::append_crc(&mut raw);
        assert!(matches!(
            parse_response(&raw, 0x01, 0x03),
            Err(RtuError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_trailing_bytes_rejected() {
        let mut raw = vec![0x01, 0x03, 0x02, 0x12, 0x34, 0x99];
        crc::append_crc(&mut raw);
        assert!(matches!(
            parse_response(&raw, 0x01, 0x03),
            Err(RtuError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_write_echo() {
        let frame = build_write_single(0x02, 0x0010, 0xBEEF);
        let pdu = parse_response(frame.as_bytes(), 0x02, FC_WRITE_SINGLE_REGISTER).unwrap();
        assert_eq!(
            pdu,
            ResponsePdu::WriteSingle {
                address: 0x0010,
                value: 0xBEEF
            }
        );
    }

    #[test]
    fn test_exception_code_display() {
        assert_eq!(ExceptionCode::from(0x02).to_string(), "illegal data address");
        assert_eq!(ExceptionCode::from(0x42).to_string(), "exception 0x42");
    }
}
