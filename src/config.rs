//! # Gateway Configuration
//!
//! JSON description of one RS-485 bus: the serial settings, the sensors on it
//! and the default values composite sensors fall back to.
//!
//! ```json
//! {
//!   "serial": { "port": "/dev/ttyUSB0", "baud_rate": 9600 },
//!   "sensors": [
//!     { "unit_id": "flow-1", "slave_id": 1, "start_register": 0,
//!       "register_count": 4, "family": { "family": "totalizer_int_float" } }
//!   ]
//! }
//! ```

use crate::error::RtuError;
use crate::payload::ChannelValues;
use crate::rtu::SerialConfig;
use crate::sensor::SensorProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub sensors: Vec<SensorProfile>,
    #[serde(default)]
    pub channel_defaults: ChannelValues,
}

impl GatewayConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RtuError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RtuError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_json(&text)?;
        log::info!(
            "Loaded {} sensor profiles from {}",
            config.sensors.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, RtuError> {
        let config: GatewayConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every profile and rejects duplicate unit ids.
    pub fn validate(&self) -> Result<(), RtuError> {
        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            sensor.validate()?;
            if !seen.insert(sensor.unit_id.as_str()) {
                return Err(RtuError::Config(format!(
                    "duplicate unit_id '{}'",
                    sensor.unit_id
                )));
            }
        }
        Ok(())
    }
}
