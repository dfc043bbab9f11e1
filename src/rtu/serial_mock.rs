//! Mock transport port implementation for testing
//!
//! This module provides a scriptable port that can be used to test the
//! exchange engine and acquisition layer without RS-485 hardware. Each queued
//! response is returned by exactly one `read` call; an exhausted queue reads
//! as silence (zero bytes).

use crate::error::RtuError;
use crate::rtu::crc::append_crc;
use crate::rtu::transport::TransportPort;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock serial port that simulates request/response traffic
#[derive(Clone)]
pub struct MockTransport {
    /// Frames written to the port (outgoing), one entry per write
    pub tx_frames: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Responses to be returned by successive reads (incoming)
    pub rx_responses: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Stale bytes sitting in the receive buffer until the next flush
    pub stale_rx: Arc<Mutex<Vec<u8>>>,
    /// Simulated error for the next write
    pub next_error: Arc<Mutex<Option<io::Error>>>,
    state: Arc<Mutex<PortState>>,
}

#[derive(Debug)]
struct PortState {
    open: bool,
    baud_rate: u32,
    input_flushes: usize,
    baud_changes: Vec<u32>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_baud(crate::constants::DEFAULT_BAUD_RATE)
    }

    pub fn with_baud(baud_rate: u32) -> Self {
        MockTransport {
            tx_frames: Arc::new(Mutex::new(Vec::new())),
            rx_responses: Arc::new(Mutex::new(VecDeque::new())),
            stale_rx: Arc::new(Mutex::new(Vec::new())),
            next_error: Arc::new(Mutex::new(None)),
            state: Arc::new(Mutex::new(PortState {
                open: true,
                baud_rate,
                input_flushes: 0,
                baud_changes: Vec::new(),
            })),
        }
    }

    /// A port that was never opened.
    pub fn closed() -> Self {
        let port = Self::new();
        lock(&port.state).open = false;
        port
    }

    /// Queue raw bytes as the next response
    pub fn queue_response(&self, bytes: &[u8]) {
        lock(&self.rx_responses).push_back(bytes.to_vec());
    }

    /// Queue a response that never arrives
    pub fn queue_silence(&self) {
        self.queue_response(&[]);
    }

    /// Queue a well-formed read response carrying `words`
    pub fn queue_registers(&self, slave_id: u8, function_code: u8, words: &[u16]) {
        let mut frame = vec![slave_id, function_code, (words.len() * 2) as u8];
        for word in words {
            frame.extend_from_slice(&word.to_be_bytes());
        }
        append_crc(&mut frame);
        self.queue_response(&frame);
    }

    /// Queue an exception response
    pub fn queue_exception(&self, slave_id: u8, function_code: u8, code: u8) {
        let mut frame = vec![slave_id, function_code | crate::constants::EXCEPTION_FLAG, code];
        append_crc(&mut frame);
        self.queue_response(&frame);
    }

    /// Queue the echo a device sends after a write (address + value/quantity)
    pub fn queue_write_echo(&self, slave_id: u8, function_code: u8, address: u16, value: u16) {
        let mut frame = vec![slave_id, function_code];
        frame.extend_from_slice(&address.to_be_bytes());
        frame.extend_from_slice(&value.to_be_bytes());
        append_crc(&mut frame);
        self.queue_response(&frame);
    }

    /// Leave bytes from an earlier, aborted exchange in the receive buffer
    pub fn inject_stale_bytes(&self, bytes: &[u8]) {
        lock(&self.stale_rx).extend_from_slice(bytes);
    }

    /// Set an error to be returned on the next write
    pub fn set_next_error(&self, error: io::Error) {
        *lock(&self.next_error) = Some(error);
    }

    /// Get all frames written to the port
    pub fn get_tx_frames(&self) -> Vec<Vec<u8>> {
        lock(&self.tx_frames).clone()
    }

    pub fn last_tx_frame(&self) -> Option<Vec<u8>> {
        lock(&self.tx_frames).last().cloned()
    }

    pub fn pending_responses(&self) -> usize {
        lock(&self.rx_responses).len()
    }

    pub fn input_flushes(&self) -> usize {
        lock(&self.state).input_flushes
    }

    /// Bit rates the port was switched to, in order
    pub fn baud_changes(&self) -> Vec<u32> {
        lock(&self.state).baud_changes.clone()
    }
}

#[async_trait]
impl TransportPort for MockTransport {
    fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    fn baud_rate(&self) -> u32 {
        lock(&self.state).baud_rate
    }

    async fn flush_input(&mut self) -> Result<(), RtuError> {
        lock(&self.stale_rx).clear();
        lock(&self.state).input_flushes += 1;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize, RtuError> {
        if let Some(error) = lock(&self.next_error).take() {
            return Err(error.into());
        }
        lock(&self.tx_frames).push(bytes.to_vec());
        Ok(bytes.len())
    }

    async fn wait_tx_done(&mut self, _timeout: Duration) -> Result<(), RtuError> {
        Ok(())
    }

    async fn read(&mut self, max_len: usize, _timeout: Duration) -> Result<Vec<u8>, RtuError> {
        let mut data: Vec<u8> = std::mem::take(&mut *lock(&self.stale_rx));
        if let Some(response) = lock(&self.rx_responses).pop_front() {
            data.extend(response);
        }
        data.truncate(max_len);
        Ok(data)
    }

    async fn set_baud(&mut self, rate: u32) -> Result<(), RtuError> {
        let mut state = lock(&self.state);
        state.baud_rate = rate;
        state.baud_changes.push(rate);
        Ok(())
    }
}
