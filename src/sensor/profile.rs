//! Static sensor descriptions loaded from gateway configuration.

use crate::constants::{DEFAULT_BAUD_RATE, MAX_READ_REGISTERS, MAX_SUB_CHANNELS};
use crate::error::RtuError;
use crate::payload::DecodeDescriptor;
use crate::rtu::{BaudRate, RegisterBank};
use crate::vendors::SensorFamily;
use serde::{Deserialize, Serialize};

fn default_register_count() -> u16 {
    1
}

fn default_scale() -> f64 {
    1.0
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_enabled() -> bool {
    true
}

fn check_read(
    what: &str,
    slave_id: u8,
    register_count: u16,
    descriptor: &DecodeDescriptor,
    scale: f64,
) -> Result<(), RtuError> {
    if slave_id == 0 || slave_id > 247 {
        return Err(RtuError::Config(format!(
            "{what}: slave id {slave_id} outside 1..=247"
        )));
    }
    if register_count == 0 || register_count > MAX_READ_REGISTERS {
        return Err(RtuError::Config(format!(
            "{what}: register count {register_count} outside 1..={MAX_READ_REGISTERS}"
        )));
    }
    if usize::from(register_count) < descriptor.register_count() {
        return Err(RtuError::Config(format!(
            "{what}: {} needs {} registers, profile reads {register_count}",
            descriptor.data_type,
            descriptor.register_count()
        )));
    }
    if !descriptor.data_type.supports(descriptor.byte_order) {
        return Err(RtuError::Config(format!(
            "{what}: {} does not support {}",
            descriptor.data_type, descriptor.byte_order
        )));
    }
    if !scale.is_finite() {
        return Err(RtuError::Config(format!("{what}: scale must be finite")));
    }
    Ok(())
}

/// One named measurement of a composite sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubChannel {
    /// Output slot name, e.g. `"ph"` or `"temperature"`
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub slave_id: u8,
    pub start_register: u16,
    #[serde(default = "default_register_count")]
    pub register_count: u16,
    #[serde(default)]
    pub bank: RegisterBank,
    #[serde(default)]
    pub descriptor: DecodeDescriptor,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl SubChannel {
    pub fn new(name: impl Into<String>, slave_id: u8, start_register: u16) -> Self {
        SubChannel {
            name: name.into(),
            enabled: true,
            slave_id,
            start_register,
            register_count: 1,
            bank: RegisterBank::Holding,
            descriptor: DecodeDescriptor::default(),
            scale: 1.0,
        }
    }

    pub fn with_descriptor(mut self, descriptor: DecodeDescriptor) -> Self {
        self.register_count = self.register_count.max(descriptor.register_count() as u16);
        self.descriptor = descriptor;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_bank(mut self, bank: RegisterBank) -> Self {
        self.bank = bank;
        self
    }
}

/// Per-device polling description.
///
/// Immutable during a poll cycle. A profile with sub-channels is acquired
/// channel by channel; otherwise its own register span is read and decoded,
/// through the vendor family when one is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorProfile {
    pub unit_id: String,
    pub slave_id: u8,
    pub start_register: u16,
    #[serde(default = "default_register_count")]
    pub register_count: u16,
    #[serde(default)]
    pub bank: RegisterBank,
    #[serde(default)]
    pub descriptor: DecodeDescriptor,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<SensorFamily>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_channels: Vec<SubChannel>,
}

impl SensorProfile {
    pub fn new(unit_id: impl Into<String>, slave_id: u8, start_register: u16) -> Self {
        SensorProfile {
            unit_id: unit_id.into(),
            slave_id,
            start_register,
            register_count: 1,
            bank: RegisterBank::Holding,
            descriptor: DecodeDescriptor::default(),
            scale: 1.0,
            baud_rate: DEFAULT_BAUD_RATE,
            family: None,
            sub_channels: Vec::new(),
        }
    }

    /// Sets the descriptor and widens the read span to fit it.
    pub fn with_descriptor(mut self, descriptor: DecodeDescriptor) -> Self {
        self.register_count = self.register_count.max(descriptor.register_count() as u16);
        self.descriptor = descriptor;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_bank(mut self, bank: RegisterBank) -> Self {
        self.bank = bank;
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_family(mut self, family: SensorFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn with_sub_channel(mut self, channel: SubChannel) -> Self {
        self.sub_channels.push(channel);
        self
    }

    pub fn is_composite(&self) -> bool {
        !self.sub_channels.is_empty()
    }

    /// Checks the profile before it is polled.
    pub fn validate(&self) -> Result<(), RtuError> {
        if self.unit_id.trim().is_empty() {
            return Err(RtuError::Config("sensor unit_id is empty".into()));
        }
        let what = format!("sensor '{}'", self.unit_id);
        BaudRate::try_from(self.baud_rate).map_err(|_| {
            RtuError::Config(format!("{what}: unsupported baud rate {}", self.baud_rate))
        })?;

        if self.sub_channels.len() > MAX_SUB_CHANNELS {
            return Err(RtuError::Config(format!(
                "{what}: {} sub-channels, at most {MAX_SUB_CHANNELS} allowed",
                self.sub_channels.len()
            )));
        }
        for channel in &self.sub_channels {
            check_read(
                &format!("{what} channel '{}'", channel.name),
                channel.slave_id,
                channel.register_count,
                &channel.descriptor,
                channel.scale,
            )?;
        }

        if let Some(family) = &self.family {
            family
                .validate()
                .map_err(|e| RtuError::Config(format!("{what}: {e}")))?;
        }
        match &self.family {
            Some(family) if family.is_fixed_layout() => {
                if self.slave_id == 0 || self.slave_id > 247 {
                    return Err(RtuError::Config(format!(
                        "{what}: slave id {} outside 1..=247",
                        self.slave_id
                    )));
                }
                if !self.scale.is_finite() {
                    return Err(RtuError::Config(format!("{what}: scale must be finite")));
                }
                Ok(())
            }
            // level families read exactly the descriptor's width
            Some(family) if family.uses_descriptor() => check_read(
                &what,
                self.slave_id,
                self.descriptor.register_count() as u16,
                &self.descriptor,
                self.scale,
            ),
            _ => check_read(
                &what,
                self.slave_id,
                self.register_count,
                &self.descriptor,
                self.scale,
            ),
        }
    }
}
