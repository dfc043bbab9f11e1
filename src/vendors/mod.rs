//! Vendor Composite Decoders for Instruments Outside the Generic Matrix
//!
//! Some field instruments do not publish a single primitive value. Flow
//! totalizers split the count across an integer and a float fraction, some
//! meters expose a raw double, and level transmitters report a distance that
//! has to be turned into a percentage of the tank. Each such family is a
//! fixed rule set implementing [`VendorDecoder`]; a profile selects one with
//! its [`SensorFamily`] tag and the exchange engine never sees the difference.
//!
//! Integrators can add families of their own through [`VendorRegistry`] and
//! refer to them from configuration by name.

pub mod level;
pub mod totalizer;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::RtuError;
use crate::payload::{DecodeDescriptor, DecodedValue};
use serde::{Deserialize, Serialize};

pub use level::{LevelFromReference, LevelOverRange, LevelPercentOfSpan};
pub use totalizer::{TotalizerIntFloat, TotalizerIntFloatSwapped, TotalizerShortInt, WideDouble};

/// Family-specific decoding rule.
pub trait VendorDecoder: Send + Sync {
    /// Stable family name used in logs and the registry.
    fn family(&self) -> &'static str;

    /// Registers to read for one measurement.
    fn register_count(&self, descriptor: &DecodeDescriptor) -> usize;

    /// Turns the register span into a value.
    ///
    /// `descriptor` is the profile's generic descriptor; families with a
    /// fixed layout ignore it.
    fn decode(
        &self,
        words: &[u16],
        descriptor: &DecodeDescriptor,
        scale: f64,
    ) -> Result<DecodedValue, RtuError>;
}

/// Family tag carried by a sensor profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum SensorFamily {
    TotalizerIntFloat,
    TotalizerIntFloatSwapped,
    TotalizerShortInt,
    WideDouble,
    LevelFromReference { reference_height: f64, span: f64 },
    LevelPercentOfSpan { span: f64 },
    LevelOverRange { span: f64 },
    /// Looked up by name in a [`VendorRegistry`]
    Registered { name: String },
}

impl SensorFamily {
    /// Whether the family decodes its magnitude with the profile descriptor.
    pub fn uses_descriptor(&self) -> bool {
        matches!(
            self,
            SensorFamily::LevelFromReference { .. }
                | SensorFamily::LevelPercentOfSpan { .. }
                | SensorFamily::LevelOverRange { .. }
        )
    }

    /// Whether the family reads a fixed register layout of its own.
    pub fn is_fixed_layout(&self) -> bool {
        matches!(
            self,
            SensorFamily::TotalizerIntFloat
                | SensorFamily::TotalizerIntFloatSwapped
                | SensorFamily::TotalizerShortInt
                | SensorFamily::WideDouble
        )
    }

    /// Checks the family parameters without building a decoder.
    pub fn validate(&self) -> Result<(), RtuError> {
        match self {
            SensorFamily::LevelFromReference {
                reference_height,
                span,
            } => {
                level::check_reference(*reference_height)?;
                level::check_span(*span).map(|_| ())
            }
            SensorFamily::LevelPercentOfSpan { span }
            | SensorFamily::LevelOverRange { span } => level::check_span(*span).map(|_| ()),
            SensorFamily::Registered { name } if name.trim().is_empty() => Err(
                RtuError::InvalidArgument("registered family name is empty".into()),
            ),
            _ => Ok(()),
        }
    }

    /// Builds the decoder for this family.
    pub fn decoder(&self, registry: &VendorRegistry) -> Result<Arc<dyn VendorDecoder>, RtuError> {
        let decoder: Arc<dyn VendorDecoder> = match self {
            SensorFamily::TotalizerIntFloat => Arc::new(TotalizerIntFloat),
            SensorFamily::TotalizerIntFloatSwapped => Arc::new(TotalizerIntFloatSwapped),
            SensorFamily::TotalizerShortInt => Arc::new(TotalizerShortInt),
            SensorFamily::WideDouble => Arc::new(WideDouble),
            SensorFamily::LevelFromReference {
                reference_height,
                span,
            } => Arc::new(LevelFromReference::new(*reference_height, *span)?),
            SensorFamily::LevelPercentOfSpan { span } => Arc::new(LevelPercentOfSpan::new(*span)?),
            SensorFamily::LevelOverRange { span } => Arc::new(LevelOverRange::new(*span)?),
            SensorFamily::Registered { name } => registry.get(name).ok_or_else(|| {
                RtuError::InvalidArgument(format!("no vendor decoder registered as '{name}'"))
            })?,
        };
        Ok(decoder)
    }
}

/// Registry for vendor decoders
#[derive(Default, Clone)]
pub struct VendorRegistry {
    inner: Arc<Mutex<HashMap<String, Arc<dyn VendorDecoder>>>>,
}

impl VendorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<dyn VendorDecoder>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a decoder under `name` (case-insensitive)
    pub fn register(&self, name: &str, decoder: Arc<dyn VendorDecoder>) -> Result<(), RtuError> {
        let mut inner = self.lock();
        let key = name.to_lowercase();

        if inner.contains_key(&key) {
            return Err(RtuError::InvalidArgument(format!(
                "Vendor decoder already registered: {name}"
            )));
        }

        inner.insert(key, decoder);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Result<(), RtuError> {
        if self.lock().remove(&name.to_lowercase()).is_none() {
            return Err(RtuError::InvalidArgument(format!(
                "No vendor decoder registered: {name}"
            )));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn VendorDecoder>> {
        self.lock().get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(&name.to_lowercase())
    }

    /// Names of all registered decoders, sorted
    pub fn registered_families(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Create a registry with the fixed-layout families registered
    pub fn with_defaults() -> Result<Self, RtuError> {
        let registry = Self::new();
        let defaults: [Arc<dyn VendorDecoder>; 4] = [
            Arc::new(TotalizerIntFloat),
            Arc::new(TotalizerIntFloatSwapped),
            Arc::new(TotalizerShortInt),
            Arc::new(WideDouble),
        ];
        for decoder in defaults {
            registry.register(decoder.family(), decoder)?;
        }
        Ok(registry)
    }
}

impl std::fmt::Debug for VendorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorRegistry")
            .field("families", &self.registered_families())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = VendorRegistry::with_defaults().unwrap();
        assert_eq!(
            registry.registered_families(),
            vec![
                "totalizer_int_float",
                "totalizer_int_float_swapped",
                "totalizer_short_int",
                "wide_double"
            ]
        );
        assert!(registry.contains("WIDE_DOUBLE"));
    }

    #[test]
    fn test_duplicate_and_missing() {
        let registry = VendorRegistry::with_defaults().unwrap();
        assert!(registry.register("wide_double", Arc::new(WideDouble)).is_err());
        assert!(registry.unregister("nope").is_err());
        registry.unregister("wide_double").unwrap();
        assert!(registry.get("wide_double").is_none());
    }

    #[test]
    fn test_family_tag_serde() {
        let family: SensorFamily = serde_json::from_str(
            r#"{"family": "level_from_reference", "reference_height": 5.0, "span": 4.0}"#,
        )
        .unwrap();
        assert_eq!(
            family,
            SensorFamily::LevelFromReference {
                reference_height: 5.0,
                span: 4.0
            }
        );
        let family: SensorFamily = serde_json::from_str(r#"{"family": "wide_double"}"#).unwrap();
        assert_eq!(family, SensorFamily::WideDouble);
    }

    #[test]
    fn test_registered_family_lookup() {
        let registry = VendorRegistry::new();
        let family = SensorFamily::Registered {
            name: "TANK_7".into(),
        };
        assert!(family.decoder(&registry).is_err());

        registry
            .register("tank_7", Arc::new(LevelPercentOfSpan::new(3.0).unwrap()))
            .unwrap();
        assert_eq!(family.decoder(&registry).unwrap().family(), "level_percent_of_span");
    }

    #[test]
    fn test_invalid_span_rejected() {
        let registry = VendorRegistry::new();
        assert!(SensorFamily::LevelOverRange { span: 0.0 }.decoder(&registry).is_err());
        assert!(SensorFamily::LevelPercentOfSpan { span: f64::NAN }
            .decoder(&registry)
            .is_err());
    }
}
