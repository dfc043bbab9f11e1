//! Runtime counters for the exchange engine.

pub mod stats;

pub use stats::ExchangeStatistics;
