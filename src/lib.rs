//! # rtu-telemetry - Modbus RTU Telemetry Gateway Core
//!
//! The rtu-telemetry crate polls RS-485 field instruments (flow meters, level
//! sensors, water-quality probes, energy meters) over Modbus RTU and turns
//! their raw 16-bit registers into physical measurements.
//!
//! ## Features
//!
//! - Modbus RTU master for read-holding, read-input, write-single and
//!   write-multiple registers, with CRC and header validation
//! - Typed failure classification (timeout, CRC, device exception, malformed
//!   response, invalid argument) and per-engine statistics
//! - Register decoding for 16/32-bit integers, single and double floats and
//!   hex in four byte orders, including compound tokens like `"INT32_4321"`
//! - Vendor composite decoders for totalizers and level transmitters
//! - Multi-channel acquisition with graceful degradation
//! - Safe baud-rate switching between devices sharing one bus
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rtu_telemetry::{open_bus, poll_sensor, SensorProfile, SerialConfig, VendorRegistry};
//! use rtu_telemetry::payload::DecodeDescriptor;
//!
//! # async fn run() -> Result<(), rtu_telemetry::RtuError> {
//! let mut engine = open_bus(&SerialConfig::default())?;
//! let profile = SensorProfile::new("flow-1", 1, 0x0000)
//!     .with_descriptor("FLOAT32_3412".parse::<DecodeDescriptor>()?);
//! let reading = poll_sensor(&mut engine, &profile, &VendorRegistry::with_defaults()?).await?;
//! println!("{} = {}", reading.unit_id, reading.value);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod instrumentation;
pub mod logging;
pub mod payload;
pub mod rtu;
pub mod sensor;
pub mod util;
pub mod vendors;

pub use crate::config::GatewayConfig;
pub use crate::error::{ErrorCategory, ExchangeResult, RtuError};
pub use crate::logging::{init_logger_with_default, log_info};

// Protocol core
pub use instrumentation::ExchangeStatistics;
pub use rtu::{
    BaudRate, ExchangeEngine, MockTransport, RegisterBank, Request, Response, SerialConfig,
    SerialTransport, SharedEngine, TransportPort,
};

// Decoding
pub use payload::{
    decode, ByteOrder, ChannelSlot, ChannelValues, DecodeDescriptor, DecodedValue, PrimitiveType,
    Reading,
};
pub use vendors::{SensorFamily, VendorDecoder, VendorRegistry};

// Acquisition
pub use sensor::{poll_channels, poll_profile, poll_sensor, SensorProfile, SubChannel};

/// Open the serial port described by `config` and bind an exchange engine to it.
///
/// # Arguments
/// * `config` - Port path, bit rate, parity and stop bits
///
/// # Returns
/// * `Ok(ExchangeEngine)` - Engine ready for exchanges
/// * `Err(RtuError)` - The port could not be opened
pub fn open_bus(config: &SerialConfig) -> Result<ExchangeEngine<SerialTransport>, RtuError> {
    Ok(ExchangeEngine::new(SerialTransport::open(config)?))
}
