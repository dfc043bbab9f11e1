//! # Exchange Statistics
//!
//! Running counters for one exchange engine. The engine is the only writer;
//! callers read snapshots through `ExchangeEngine::statistics()`.
//!
//! Every exchange attempt is counted exactly once in `total_requests` and
//! then exactly once as a success or a failure, so after any sequence of
//! calls `total == successful + failed` and
//! `failed == timeouts + crc_errors + other_failures()`.
//!
//! ## Usage
//!
//! ```ignore
//! let stats = engine.statistics();
//! if stats.success_rate() < 90.0 {
//!     log::warn!("bus degraded: {stats:?}");
//! }
//! engine.reset_statistics();
//! ```

use crate::error::{ErrorCategory, RtuError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeStatistics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub timeouts: u64,
    pub crc_errors: u64,
    /// Device-reported exceptions; part of `other_failures()`
    pub protocol_exceptions: u64,
    pub last_error: Option<ErrorCategory>,
}

impl ExchangeStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_attempt(&mut self) {
        self.total_requests += 1;
    }

    pub(crate) fn record_success(&mut self) {
        self.successful_requests += 1;
    }

    pub(crate) fn record_failure(&mut self, error: &RtuError) {
        self.failed_requests += 1;
        let category = error.category();
        match category {
            ErrorCategory::Timeout => self.timeouts += 1,
            ErrorCategory::InvalidCrc => self.crc_errors += 1,
            ErrorCategory::ProtocolException(_) => self.protocol_exceptions += 1,
            _ => {}
        }
        self.last_error = Some(category);
    }

    /// Failures that were neither timeouts nor CRC errors.
    pub fn other_failures(&self) -> u64 {
        self.failed_requests - self.timeouts - self.crc_errors
    }

    /// Percentage of attempts that succeeded, 0.0 before the first attempt.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64 * 100.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
