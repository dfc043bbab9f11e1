//! The rtu module contains the Modbus RTU protocol core: checksum, frame
//! building and validation, the transport abstraction and the exchange engine
//! that drives one request/response cycle at a time.

pub mod crc;
pub mod exchange;
pub mod frame;
pub mod serial_mock;
pub mod transport;

pub use self::crc::{crc16, crc16_wire, verify};
pub use self::exchange::{
    ExchangeEngine, ExchangeState, RegisterBank, Request, Response, SharedEngine,
};
pub use self::frame::{ExceptionCode, RegisterFrame, ResponsePdu};
pub use self::serial_mock::MockTransport;
pub use self::transport::{BaudRate, Parity, SerialConfig, SerialTransport, TransportPort};
