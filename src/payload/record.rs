//! # Readings
//!
//! A [`Reading`] is the unit of output handed to the serialization layer: one
//! decoded measurement, its raw bit pattern, and for composite sensors the
//! per-channel values.

use crate::error::RtuError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named output slots of composite (multi-channel) sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelSlot {
    Ph,
    Tds,
    Temperature,
    Humidity,
    Tss,
    Bod,
    Cod,
    Conductivity,
}

impl ChannelSlot {
    pub const ALL: [ChannelSlot; 8] = [
        ChannelSlot::Ph,
        ChannelSlot::Tds,
        ChannelSlot::Temperature,
        ChannelSlot::Humidity,
        ChannelSlot::Tss,
        ChannelSlot::Bod,
        ChannelSlot::Cod,
        ChannelSlot::Conductivity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelSlot::Ph => "ph",
            ChannelSlot::Tds => "tds",
            ChannelSlot::Temperature => "temperature",
            ChannelSlot::Humidity => "humidity",
            ChannelSlot::Tss => "tss",
            ChannelSlot::Bod => "bod",
            ChannelSlot::Cod => "cod",
            ChannelSlot::Conductivity => "conductivity",
        }
    }
}

impl FromStr for ChannelSlot {
    type Err = RtuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ph" => Ok(ChannelSlot::Ph),
            "tds" => Ok(ChannelSlot::Tds),
            "temperature" | "temp" => Ok(ChannelSlot::Temperature),
            "humidity" => Ok(ChannelSlot::Humidity),
            "tss" => Ok(ChannelSlot::Tss),
            "bod" => Ok(ChannelSlot::Bod),
            "cod" => Ok(ChannelSlot::Cod),
            "conductivity" | "ec" => Ok(ChannelSlot::Conductivity),
            other => Err(RtuError::InvalidArgument(format!(
                "unknown channel '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ChannelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical value per slot.
///
/// The defaults are plausible resting values for a water-quality probe so
/// that a channel that could not be read does not report zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelValues {
    pub ph: f64,
    pub tds: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub tss: f64,
    pub bod: f64,
    pub cod: f64,
    pub conductivity: f64,
}

impl Default for ChannelValues {
    fn default() -> Self {
        ChannelValues {
            ph: 7.0,
            tds: 0.0,
            temperature: 25.0,
            humidity: 50.0,
            tss: 0.0,
            bod: 0.0,
            cod: 0.0,
            conductivity: 0.0,
        }
    }
}

impl ChannelValues {
    pub fn get(&self, slot: ChannelSlot) -> f64 {
        match slot {
            ChannelSlot::Ph => self.ph,
            ChannelSlot::Tds => self.tds,
            ChannelSlot::Temperature => self.temperature,
            ChannelSlot::Humidity => self.humidity,
            ChannelSlot::Tss => self.tss,
            ChannelSlot::Bod => self.bod,
            ChannelSlot::Cod => self.cod,
            ChannelSlot::Conductivity => self.conductivity,
        }
    }

    pub fn set(&mut self, slot: ChannelSlot, value: f64) {
        let field = match slot {
            ChannelSlot::Ph => &mut self.ph,
            ChannelSlot::Tds => &mut self.tds,
            ChannelSlot::Temperature => &mut self.temperature,
            ChannelSlot::Humidity => &mut self.humidity,
            ChannelSlot::Tss => &mut self.tss,
            ChannelSlot::Bod => &mut self.bod,
            ChannelSlot::Cod => &mut self.cod,
            ChannelSlot::Conductivity => &mut self.conductivity,
        };
        *field = value;
    }
}

/// Decoded measurement of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub unit_id: String,
    pub value: f64,
    pub raw: u64,
    pub raw_hex: String,
    pub valid: bool,
    /// Stamped by the caller's clock; the core never reads wall time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<ChannelValues>,
}

impl Reading {
    /// An invalid reading carrying no measurement.
    pub fn invalid(unit_id: impl Into<String>) -> Self {
        Reading {
            unit_id: unit_id.into(),
            value: 0.0,
            raw: 0,
            raw_hex: String::new(),
            valid: false,
            timestamp: None,
            channels: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
