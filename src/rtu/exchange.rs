//! # Modbus RTU Exchange Engine
//!
//! This module drives one request/response cycle at a time against a
//! [`TransportPort`]: it builds the frame, flushes stale input, transmits,
//! waits for the bus turnaround, performs a single bounded read and
//! validates the answer. Every call updates the engine's statistics before
//! returning.
//!
//! There is no retry at this layer. A failed exchange is reported to the
//! caller, which owns any retry or backoff policy.
//!
//! All operations take `&mut self`, so one engine can never have two
//! exchanges in flight. To share a bus between tasks, wrap the engine in a
//! [`SharedEngine`] and hold the lock across the whole exchange-plus-decode
//! sequence.

use crate::constants::{
    BAUD_SETTLE_TIME, EXCEPTION_FLAG, FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS,
    FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER, MAX_FRAME_SIZE, MIN_RESPONSE_LEN,
    MIN_WRITE_RESPONSE_LEN, RESPONSE_TIMEOUT, TX_DONE_TIMEOUT,
};
use crate::error::{ExchangeResult, RtuError};
use crate::instrumentation::stats::ExchangeStatistics;
use crate::rtu::frame::{self, RegisterFrame, ResponsePdu};
use crate::rtu::transport::{BaudRate, TransportPort};
use crate::util::hex::log_frame_hex;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An engine shared between tasks polling the same bus.
pub type SharedEngine<P> = Arc<tokio::sync::Mutex<ExchangeEngine<P>>>;

/// Register read category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterBank {
    #[default]
    Holding,
    Input,
}

impl RegisterBank {
    pub fn function_code(self) -> u8 {
        match self {
            RegisterBank::Holding => FC_READ_HOLDING_REGISTERS,
            RegisterBank::Input => FC_READ_INPUT_REGISTERS,
        }
    }
}

/// One Modbus transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadHolding { slave_id: u8, start: u16, quantity: u16 },
    ReadInput { slave_id: u8, start: u16, quantity: u16 },
    WriteSingle { slave_id: u8, address: u16, value: u16 },
    WriteMultiple { slave_id: u8, start: u16, values: Vec<u16> },
}

impl Request {
    pub fn read(bank: RegisterBank, slave_id: u8, start: u16, quantity: u16) -> Self {
        match bank {
            RegisterBank::Holding => Request::ReadHolding {
                slave_id,
                start,
                quantity,
            },
            RegisterBank::Input => Request::ReadInput {
                slave_id,
                start,
                quantity,
            },
        }
    }

    pub fn slave_id(&self) -> u8 {
        match self {
            Request::ReadHolding { slave_id, .. }
            | Request::ReadInput { slave_id, .. }
            | Request::WriteSingle { slave_id, .. }
            | Request::WriteMultiple { slave_id, .. } => *slave_id,
        }
    }

    pub fn function_code(&self) -> u8 {
        match self {
            Request::ReadHolding { .. } => FC_READ_HOLDING_REGISTERS,
            Request::ReadInput { .. } => FC_READ_INPUT_REGISTERS,
            Request::WriteSingle { .. } => FC_WRITE_SINGLE_REGISTER,
            Request::WriteMultiple { .. } => FC_WRITE_MULTIPLE_REGISTERS,
        }
    }

    fn is_write(&self) -> bool {
        matches!(self, Request::WriteSingle { .. } | Request::WriteMultiple { .. })
    }

    pub fn to_frame(&self) -> Result<RegisterFrame, RtuError> {
        match self {
            Request::ReadHolding {
                slave_id,
                start,
                quantity,
            }
            | Request::ReadInput {
                slave_id,
                start,
                quantity,
            } => frame::build_read(*slave_id, self.function_code(), *start, *quantity),
            Request::WriteSingle {
                slave_id,
                address,
                value,
            } => Ok(frame::build_write_single(*slave_id, *address, *value)),
            Request::WriteMultiple {
                slave_id,
                start,
                values,
            } => frame::build_write_multiple(*slave_id, *start, values),
        }
    }

    /// Cross-checks a validated response body against this request.
    fn accept(&self, pdu: ResponsePdu) -> ExchangeResult<Response> {
        match (self, pdu) {
            (
                Request::ReadHolding { quantity, .. } | Request::ReadInput { quantity, .. },
                ResponsePdu::Registers(words),
            ) => {
                if words.len() != usize::from(*quantity) {
                    return Err(RtuError::MalformedResponse(format!(
                        "requested {quantity} registers, received {}",
                        words.len()
                    )));
                }
                Ok(Response::Registers(words))
            }
            (
                Request::WriteSingle { address, value, .. },
                ResponsePdu::WriteSingle {
                    address: echoed_address,
                    value: echoed_value,
                },
            ) => {
                if echoed_address != *address || echoed_value != *value {
                    return Err(RtuError::MalformedResponse(format!(
                        "write echo 0x{echoed_address:04X}=0x{echoed_value:04X}, \
                         sent 0x{address:04X}=0x{value:04X}"
                    )));
                }
                Ok(Response::Written {
                    address: *address,
                    quantity: 1,
                })
            }
            (
                Request::WriteMultiple { start, values, .. },
                ResponsePdu::WriteMultiple {
                    start: echoed_start,
                    quantity,
                },
            ) => {
                if echoed_start != *start || usize::from(quantity) != values.len() {
                    return Err(RtuError::MalformedResponse(format!(
                        "write echo {quantity} registers at 0x{echoed_start:04X}, \
                         sent {} at 0x{start:04X}",
                        values.len()
                    )));
                }
                Ok(Response::Written {
                    address: *start,
                    quantity,
                })
            }
            (_, pdu) => Err(RtuError::MalformedResponse(format!(
                "unexpected response body {pdu:?}"
            ))),
        }
    }
}

/// Successful outcome of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Register words owned by the caller.
    Registers(Vec<u16>),
    /// Confirmed write of `quantity` registers starting at `address`.
    Written { address: u16, quantity: u16 },
}

/// Phase of the most recent exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sending,
    AwaitingResponse,
    Validating,
    Done,
    TimedOut,
    Failed,
}

/// Modbus RTU master bound to one transport port.
pub struct ExchangeEngine<P: TransportPort> {
    port: P,
    stats: ExchangeStatistics,
    state: ExchangeState,
}

impl<P: TransportPort> ExchangeEngine<P> {
    pub fn new(port: P) -> Self {
        ExchangeEngine {
            port,
            stats: ExchangeStatistics::new(),
            state: ExchangeState::Idle,
        }
    }

    /// Wraps the engine for use from several tasks.
    pub fn into_shared(self) -> SharedEngine<P> {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    /// Runs one request/response cycle.
    ///
    /// An unopened port fails fast with [`RtuError::PortNotOpen`] and is not
    /// counted; every other outcome is counted exactly once.
    pub async fn execute(&mut self, request: &Request) -> ExchangeResult<Response> {
        if !self.port.is_open() {
            return Err(RtuError::PortNotOpen);
        }

        self.stats.record_attempt();
        let result = self.transact(request).await;

        match &result {
            Ok(_) => {
                self.stats.record_success();
                self.state = ExchangeState::Done;
            }
            Err(e) => {
                self.stats.record_failure(e);
                self.state = match e {
                    RtuError::Timeout => ExchangeState::TimedOut,
                    _ => ExchangeState::Failed,
                };
                warn!(
                    "Exchange with slave {} (fc 0x{:02X}) failed: {e}",
                    request.slave_id(),
                    request.function_code()
                );
            }
        }
        result
    }

    async fn transact(&mut self, request: &Request) -> ExchangeResult<Response> {
        let frame = request.to_frame()?;

        self.state = ExchangeState::Sending;
        self.port.flush_input().await?;
        log_frame_hex("TX", frame.as_bytes());
        let written = self.port.write(frame.as_bytes()).await?;
        if written != frame.len() {
            return Err(RtuError::SerialPortError(format!(
                "short write: {written} of {} bytes",
                frame.len()
            )));
        }
        self.port.wait_tx_done(TX_DONE_TIMEOUT).await?;

        // take the reply whole; its size is checked while parsing
        self.state = ExchangeState::AwaitingResponse;
        let raw = self.port.read(MAX_FRAME_SIZE, RESPONSE_TIMEOUT).await?;
        log_frame_hex("RX", &raw);

        self.state = ExchangeState::Validating;
        if raw.is_empty() {
            return Err(RtuError::Timeout);
        }
        if raw.len() < MIN_RESPONSE_LEN {
            return Err(RtuError::MalformedResponse(format!(
                "only {} bytes received",
                raw.len()
            )));
        }
        let is_exception = raw[1] & EXCEPTION_FLAG != 0;
        if request.is_write() && !is_exception && raw.len() < MIN_WRITE_RESPONSE_LEN {
            return Err(RtuError::MalformedResponse(format!(
                "write response of {} bytes",
                raw.len()
            )));
        }

        let pdu = frame::parse_response(&raw, request.slave_id(), request.function_code())?;
        request.accept(pdu)
    }

    /// Reads `quantity` registers from the given bank.
    pub async fn read_registers(
        &mut self,
        slave_id: u8,
        bank: RegisterBank,
        start: u16,
        quantity: u16,
    ) -> ExchangeResult<Vec<u16>> {
        match self
            .execute(&Request::read(bank, slave_id, start, quantity))
            .await?
        {
            Response::Registers(words) => Ok(words),
            other => Err(RtuError::MalformedResponse(format!(
                "read returned {other:?}"
            ))),
        }
    }

    pub async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        start: u16,
        quantity: u16,
    ) -> ExchangeResult<Vec<u16>> {
        self.read_registers(slave_id, RegisterBank::Holding, start, quantity)
            .await
    }

    pub async fn read_input_registers(
        &mut self,
        slave_id: u8,
        start: u16,
        quantity: u16,
    ) -> ExchangeResult<Vec<u16>> {
        self.read_registers(slave_id, RegisterBank::Input, start, quantity)
            .await
    }

    pub async fn write_single_register(
        &mut self,
        slave_id: u8,
        address: u16,
        value: u16,
    ) -> ExchangeResult<()> {
        self.execute(&Request::WriteSingle {
            slave_id,
            address,
            value,
        })
        .await
        .map(|_| ())
    }

    pub async fn write_multiple_registers(
        &mut self,
        slave_id: u8,
        start: u16,
        values: &[u16],
    ) -> ExchangeResult<()> {
        self.execute(&Request::WriteMultiple {
            slave_id,
            start,
            values: values.to_vec(),
        })
        .await
        .map(|_| ())
    }

    /// Switches the bus bit rate between polls of devices with different rates.
    ///
    /// No-op when `rate` is already configured. Otherwise the port is
    /// reconfigured, left to settle, and its input flushed so stale bytes
    /// cannot corrupt the next frame boundary.
    pub async fn set_baud(&mut self, rate: u32) -> Result<(), RtuError> {
        if !self.port.is_open() {
            return Err(RtuError::PortNotOpen);
        }
        let current = self.port.baud_rate();
        if rate == current {
            return Ok(());
        }
        BaudRate::try_from(rate)?;

        info!("Switching bus from {current} to {rate} baud");
        self.port.set_baud(rate).await?;
        tokio::time::sleep(BAUD_SETTLE_TIME).await;
        self.port.flush_input().await?;
        debug!("Bus settled at {rate} baud");
        Ok(())
    }

    pub fn baud_rate(&self) -> u32 {
        self.port.baud_rate()
    }

    /// Snapshot of the running counters.
    pub fn statistics(&self) -> ExchangeStatistics {
        self.stats.clone()
    }

    pub fn reset_statistics(&mut self) {
        self.stats.reset();
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_inner(self) -> P {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtu::serial_mock::MockTransport;

    #[tokio::test]
    async fn test_state_after_success_and_timeout() {
        let mock = MockTransport::new();
        let mut engine = ExchangeEngine::new(mock.clone());
        assert_eq!(engine.state(), ExchangeState::Idle);

        mock.queue_registers(0x01, FC_READ_HOLDING_REGISTERS, &[0x0001]);
        engine.read_holding_registers(0x01, 0, 1).await.unwrap();
        assert_eq!(engine.state(), ExchangeState::Done);

        mock.queue_silence();
        assert!(engine.read_holding_registers(0x01, 0, 1).await.is_err());
        assert_eq!(engine.state(), ExchangeState::TimedOut);
    }

    #[tokio::test]
    async fn test_request_frame_on_the_wire() {
        let mock = MockTransport::new();
        let mut engine = ExchangeEngine::new(mock.clone());
        mock.queue_registers(0x01, FC_READ_HOLDING_REGISTERS, &[0, 0]);
        engine.read_holding_registers(0x01, 0x0000, 2).await.unwrap();
        assert_eq!(
            mock.last_tx_frame().unwrap(),
            vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B]
        );
    }

    #[test]
    fn test_request_function_codes() {
        let read = Request::read(RegisterBank::Input, 1, 0, 4);
        assert_eq!(read.function_code(), FC_READ_INPUT_REGISTERS);
        assert!(!read.is_write());
        let write = Request::WriteSingle {
            slave_id: 1,
            address: 0,
            value: 0,
        };
        assert_eq!(write.function_code(), FC_WRITE_SINGLE_REGISTER);
        assert!(write.is_write());
    }

    #[tokio::test]
    async fn test_shared_engine_serializes_access() {
        let mock = MockTransport::new();
        mock.queue_registers(0x01, FC_READ_INPUT_REGISTERS, &[0x00FF]);
        let shared = ExchangeEngine::new(mock).into_shared();

        let task = {
            let shared = shared.clone();
            tokio::spawn(async move {
                let mut engine = shared.lock().await;
                engine.read_input_registers(0x01, 0, 1).await
            })
        };
        assert_eq!(task.await.unwrap().unwrap(), vec![0x00FF]);
        assert_eq!(shared.lock().await.statistics().successful_requests, 1);
    }
}
