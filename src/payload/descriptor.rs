//! # Decode Descriptors
//!
//! A [`DecodeDescriptor`] names how raw register words are reassembled: a
//! primitive type plus one of four byte orders. Descriptors usually come from
//! gateway configuration, either as a separate type and order pair
//! (`"UINT32"` + `"LITTLE_ENDIAN"`) or as one compound token such as
//! `"INT32_4321"` whose digits give the wire position of each byte.
//!
//! Compound tokens are resolved through a fixed table; anything else must be
//! a plain type name, otherwise resolution fails with `InvalidArgument`.
//!
//! ```rust
//! use rtu_telemetry::payload::{ByteOrder, DecodeDescriptor, PrimitiveType};
//!
//! let d = DecodeDescriptor::resolve("uint32_3412", None).unwrap();
//! assert_eq!(d.data_type, PrimitiveType::Uint32);
//! assert_eq!(d.byte_order, ByteOrder::LittleEndian);
//! ```

use crate::error::RtuError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Register-level value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float32,
    Float64,
    /// Two words shown verbatim, for diagnostics only
    Hex,
}

impl PrimitiveType {
    /// Number of registers the type occupies.
    pub fn register_count(self) -> usize {
        match self {
            PrimitiveType::Uint16 | PrimitiveType::Int16 => 1,
            PrimitiveType::Uint32
            | PrimitiveType::Int32
            | PrimitiveType::Float32
            | PrimitiveType::Hex => 2,
            PrimitiveType::Float64 => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveType::Uint16 => "UINT16",
            PrimitiveType::Int16 => "INT16",
            PrimitiveType::Uint32 => "UINT32",
            PrimitiveType::Int32 => "INT32",
            PrimitiveType::Float32 => "FLOAT32",
            PrimitiveType::Float64 => "FLOAT64",
            PrimitiveType::Hex => "HEX",
        }
    }

    /// Whether `order` is meaningful for this type.
    pub fn supports(self, order: ByteOrder) -> bool {
        match self {
            PrimitiveType::Float32 => {
                matches!(order, ByteOrder::BigEndian | ByteOrder::LittleEndian)
            }
            PrimitiveType::Float64 => matches!(
                order,
                ByteOrder::BigEndian | ByteOrder::LittleEndian | ByteOrder::MixedBadc
            ),
            _ => true,
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = RtuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "UINT16" | "U16" => Ok(PrimitiveType::Uint16),
            "INT16" | "I16" => Ok(PrimitiveType::Int16),
            "UINT32" | "U32" => Ok(PrimitiveType::Uint32),
            "INT32" | "I32" => Ok(PrimitiveType::Int32),
            "FLOAT32" | "F32" | "FLOAT" => Ok(PrimitiveType::Float32),
            "FLOAT64" | "F64" | "DOUBLE" => Ok(PrimitiveType::Float64),
            "HEX" => Ok(PrimitiveType::Hex),
            other => Err(RtuError::InvalidArgument(format!(
                "unknown data type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Word/byte arrangement of multi-register values.
///
/// Using ABCD notation for the value `0xAABBCCDD` held in two registers:
/// - `BigEndian` (ABCD): words `[AABB, CCDD]`
/// - `LittleEndian` (CDAB): words `[CCDD, AABB]`, the common Modbus word swap
/// - `MixedBadc` (BADC): words `[BBAA, DDCC]`
/// - `MixedDcba` (DCBA): words `[DDCC, BBAA]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
    MixedBadc,
    MixedDcba,
}

impl ByteOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            ByteOrder::BigEndian => "BIG_ENDIAN",
            ByteOrder::LittleEndian => "LITTLE_ENDIAN",
            ByteOrder::MixedBadc => "MIXED_BADC",
            ByteOrder::MixedDcba => "MIXED_DCBA",
        }
    }

    /// Whether the two bytes inside each register are exchanged.
    pub fn swaps_bytes(self) -> bool {
        matches!(self, ByteOrder::MixedBadc | ByteOrder::MixedDcba)
    }
}

impl FromStr for ByteOrder {
    type Err = RtuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "");
        match normalized.as_str() {
            "BIG_ENDIAN" | "BIGENDIAN" | "BE" | "ABCD" | "1234" => Ok(ByteOrder::BigEndian),
            "LITTLE_ENDIAN" | "LITTLEENDIAN" | "LE" | "CDAB" | "3412" => {
                Ok(ByteOrder::LittleEndian)
            }
            "MIXED_BADC" | "BADC" | "2143" => Ok(ByteOrder::MixedBadc),
            "MIXED_DCBA" | "DCBA" | "4321" => Ok(ByteOrder::MixedDcba),
            other => Err(RtuError::InvalidArgument(format!(
                "unknown byte order '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compound tokens carrying both type and order.
static COMPOUND_TOKENS: &[(&str, PrimitiveType, ByteOrder)] = &[
    ("UINT32_1234", PrimitiveType::Uint32, ByteOrder::BigEndian),
    ("UINT32_3412", PrimitiveType::Uint32, ByteOrder::LittleEndian),
    ("UINT32_2143", PrimitiveType::Uint32, ByteOrder::MixedBadc),
    ("UINT32_4321", PrimitiveType::Uint32, ByteOrder::MixedDcba),
    ("INT32_1234", PrimitiveType::Int32, ByteOrder::BigEndian),
    ("INT32_3412", PrimitiveType::Int32, ByteOrder::LittleEndian),
    ("INT32_2143", PrimitiveType::Int32, ByteOrder::MixedBadc),
    ("INT32_4321", PrimitiveType::Int32, ByteOrder::MixedDcba),
    // float tokens only distinguish word order
    ("FLOAT32_1234", PrimitiveType::Float32, ByteOrder::BigEndian),
    ("FLOAT32_3412", PrimitiveType::Float32, ByteOrder::LittleEndian),
    ("FLOAT32_4321", PrimitiveType::Float32, ByteOrder::LittleEndian),
    ("FLOAT64_12345678", PrimitiveType::Float64, ByteOrder::BigEndian),
    ("FLOAT64_87654321", PrimitiveType::Float64, ByteOrder::LittleEndian),
    ("FLOAT64_21436587", PrimitiveType::Float64, ByteOrder::MixedBadc),
];

/// How to turn raw register words into a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DescriptorConfig", into = "DescriptorConfig")]
pub struct DecodeDescriptor {
    pub data_type: PrimitiveType,
    pub byte_order: ByteOrder,
}

impl DecodeDescriptor {
    pub const fn new(data_type: PrimitiveType, byte_order: ByteOrder) -> Self {
        DecodeDescriptor {
            data_type,
            byte_order,
        }
    }

    /// Resolves a configured type string and optional order string.
    ///
    /// A compound token fixes the order on its own and takes precedence over
    /// `byte_order`. A plain type name uses `byte_order`, defaulting to
    /// big-endian.
    pub fn resolve(data_type: &str, byte_order: Option<&str>) -> Result<Self, RtuError> {
        let token = data_type.trim().to_uppercase();
        if let Some((_, ty, order)) = COMPOUND_TOKENS.iter().find(|(name, _, _)| *name == token) {
            if let Some(explicit) = byte_order {
                log::debug!("Compound type {token} overrides byte order '{explicit}'");
            }
            return Ok(DecodeDescriptor::new(*ty, *order));
        }

        let ty = token.parse::<PrimitiveType>()?;
        let order = match byte_order {
            Some(s) if !s.trim().is_empty() => s.parse::<ByteOrder>()?,
            _ => ByteOrder::BigEndian,
        };
        Ok(DecodeDescriptor::new(ty, order))
    }

    pub fn register_count(&self) -> usize {
        self.data_type.register_count()
    }
}

impl Default for DecodeDescriptor {
    fn default() -> Self {
        DecodeDescriptor::new(PrimitiveType::Uint16, ByteOrder::BigEndian)
    }
}

impl FromStr for DecodeDescriptor {
    type Err = RtuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DecodeDescriptor::resolve(s, None)
    }
}

impl fmt::Display for DecodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.data_type, self.byte_order)
    }
}

/// Configuration form of a descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DescriptorConfig {
    data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    byte_order: Option<String>,
}

impl TryFrom<DescriptorConfig> for DecodeDescriptor {
    type Error = RtuError;

    fn try_from(config: DescriptorConfig) -> Result<Self, Self::Error> {
        DecodeDescriptor::resolve(&config.data_type, config.byte_order.as_deref())
    }
}

impl From<DecodeDescriptor> for DescriptorConfig {
    fn from(d: DecodeDescriptor) -> Self {
        DescriptorConfig {
            data_type: d.data_type.as_str().to_string(),
            byte_order: Some(d.byte_order.as_str().to_string()),
        }
    }
}
