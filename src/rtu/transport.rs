//! # RS-485 Transport Port
//!
//! This module defines the half-duplex byte channel the exchange engine
//! drives, and its `tokio-serial` implementation. The engine treats the port
//! as an opaque capability: every operation is bounded by the timeout it is
//! given, and a port that was never opened reports so through `is_open`.

use crate::constants::{DEFAULT_BAUD_RATE, FRAME_GAP_FLOOR};
use crate::error::RtuError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt};

/// Byte-oriented half-duplex serial channel.
#[async_trait]
pub trait TransportPort: Send {
    /// Whether the underlying device is open and configured.
    fn is_open(&self) -> bool;

    /// Currently configured bit rate.
    fn baud_rate(&self) -> u32;

    /// Discards any bytes received but not yet read.
    async fn flush_input(&mut self) -> Result<(), RtuError>;

    /// Queues `bytes` for transmission and returns how many were accepted.
    async fn write(&mut self, bytes: &[u8]) -> Result<usize, RtuError>;

    /// Waits until the transmit side has drained, turning the bus around.
    ///
    /// For [`SerialTransport`] this flushes the async stream into the OS
    /// driver only. It does not wait for the UART shift register to empty
    /// (no `tcdrain`), so adapters that switch RS-485 direction in software
    /// need automatic direction control or a turnaround delay of their own.
    async fn wait_tx_done(&mut self, timeout: Duration) -> Result<(), RtuError>;

    /// Reads one frame of at most `max_len` bytes.
    ///
    /// Waits up to `timeout` for the first byte, then collects bytes until
    /// the line falls silent or `max_len` arrived. An empty vector means
    /// nothing arrived within `timeout`.
    async fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, RtuError>;

    /// Reconfigures the bit rate.
    async fn set_baud(&mut self, rate: u32) -> Result<(), RtuError>;
}

/// Standard RS-485 bit rates used by field instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaudRate {
    Baud1200,
    Baud2400,
    Baud4800,
    Baud9600,
    Baud19200,
    Baud38400,
    Baud57600,
    Baud115200,
}

impl BaudRate {
    pub const ALL_RATES: [BaudRate; 8] = [
        BaudRate::Baud9600,
        BaudRate::Baud4800,
        BaudRate::Baud19200,
        BaudRate::Baud2400,
        BaudRate::Baud38400,
        BaudRate::Baud1200,
        BaudRate::Baud57600,
        BaudRate::Baud115200,
    ];

    pub fn as_u32(self) -> u32 {
        match self {
            BaudRate::Baud1200 => 1200,
            BaudRate::Baud2400 => 2400,
            BaudRate::Baud4800 => 4800,
            BaudRate::Baud9600 => 9600,
            BaudRate::Baud19200 => 19200,
            BaudRate::Baud38400 => 38400,
            BaudRate::Baud57600 => 57600,
            BaudRate::Baud115200 => 115200,
        }
    }

    /// Modbus RTU silent interval (3.5 character times), fixed at 1.75 ms
    /// above 19200 baud.
    pub fn inter_frame_delay(self) -> Duration {
        let rate = self.as_u32();
        if rate > 19200 {
            Duration::from_micros(1750)
        } else {
            // 11 bits per character, 3.5 characters
            Duration::from_micros(38_500_000 / u64::from(rate))
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = RtuError;

    fn try_from(rate: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL_RATES
            .iter()
            .copied()
            .find(|b| b.as_u32() == rate)
            .ok_or_else(|| RtuError::InvalidArgument(format!("unsupported baud rate {rate}")))
    }
}

/// Parity setting, serializable for gateway configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

/// Configuration for serial connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

/// `tokio-serial` backed RS-485 port.
pub struct SerialTransport {
    port: Option<tokio_serial::SerialStream>,
    baud_rate: u32,
}

impl SerialTransport {
    /// Opens the device named in `config` with 8 data bits.
    pub fn open(config: &SerialConfig) -> Result<Self, RtuError> {
        BaudRate::try_from(config.baud_rate)?;
        let stop_bits = match config.stop_bits {
            1 => tokio_serial::StopBits::One,
            2 => tokio_serial::StopBits::Two,
            other => {
                return Err(RtuError::InvalidArgument(format!(
                    "unsupported stop bits {other}"
                )))
            }
        };
        let port = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(stop_bits)
            .parity(config.parity.into())
            .open_native_async()?;

        log::info!("Opened {} at {} baud", config.port, config.baud_rate);
        Ok(SerialTransport {
            port: Some(port),
            baud_rate: config.baud_rate,
        })
    }

    /// Releases the device; subsequent operations report `PortNotOpen`.
    pub fn close(&mut self) {
        self.port = None;
    }

    fn stream(&mut self) -> Result<&mut tokio_serial::SerialStream, RtuError> {
        self.port.as_mut().ok_or(RtuError::PortNotOpen)
    }
}

#[async_trait]
impl TransportPort for SerialTransport {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    async fn flush_input(&mut self) -> Result<(), RtuError> {
        SerialPort::clear(self.stream()?, ClearBuffer::Input)?;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize, RtuError> {
        // 3.5 character times of silence mark the start of a frame
        let silent = BaudRate::try_from(self.baud_rate)?.inter_frame_delay();
        tokio::time::sleep(silent).await;
        AsyncWriteExt::write_all(self.stream()?, bytes).await?;
        Ok(bytes.len())
    }

    async fn wait_tx_done(&mut self, limit: Duration) -> Result<(), RtuError> {
        let stream = self.stream()?;
        timeout(limit, AsyncWriteExt::flush(stream))
            .await
            .map_err(|_| RtuError::SerialPortError("transmit did not complete".into()))??;
        Ok(())
    }

    async fn read(&mut self, max_len: usize, limit: Duration) -> Result<Vec<u8>, RtuError> {
        let gap = BaudRate::try_from(self.baud_rate)?
            .inter_frame_delay()
            .max(FRAME_GAP_FLOOR);
        let stream = self.stream()?;
        let mut buf = vec![0u8; max_len];

        let mut filled = match timeout(limit, AsyncReadExt::read(&mut *stream, &mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => 0,
        };
        // the frame ends at the first silent gap
        while filled > 0 && filled < max_len {
            match timeout(gap, AsyncReadExt::read(&mut *stream, &mut buf[filled..])).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) => return Err(e.into()),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }

    async fn set_baud(&mut self, rate: u32) -> Result<(), RtuError> {
        BaudRate::try_from(rate)?;
        SerialPort::set_baud_rate(self.stream()?, rate)?;
        self.baud_rate = rate;
        Ok(())
    }
}
