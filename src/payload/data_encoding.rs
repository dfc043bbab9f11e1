//! # Register Data Encoding and Decoding
//!
//! This module converts raw 16-bit register words into physical values
//! according to a [`DecodeDescriptor`], and provides the inverse encoders used
//! to build register images for writes and simulated devices.
//!
//! Composition rules for two-register values (`w0` first on the wire):
//!
//! | Order          | 32-bit pattern                          |
//! |----------------|-----------------------------------------|
//! | `BigEndian`    | `w0 << 16 \| w1`                        |
//! | `LittleEndian` | `w1 << 16 \| w0`                        |
//! | `MixedBadc`    | bytes swapped in each word, then BE     |
//! | `MixedDcba`    | bytes swapped in each word, then LE     |
//!
//! Four-register doubles follow the same idea with words `w0..w3`.

use crate::error::RtuError;
use crate::payload::descriptor::{ByteOrder, DecodeDescriptor, PrimitiveType};
use crate::util::hex::words_to_hex;
use serde::{Deserialize, Serialize};

/// Result of decoding one value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodedValue {
    /// Bit pattern before sign interpretation or scaling, zero-extended
    pub raw: u64,
    pub scaled: f64,
}

fn ensure_words(words: &[u16], needed: usize, data_type: PrimitiveType) -> Result<(), RtuError> {
    if words.len() < needed {
        return Err(RtuError::InvalidArgument(format!(
            "{data_type} needs {needed} registers, got {}",
            words.len()
        )));
    }
    Ok(())
}

/// Combines two registers into a 32-bit pattern.
pub fn combine_u32(w0: u16, w1: u16, order: ByteOrder) -> u32 {
    let (hi, lo) = match order {
        ByteOrder::BigEndian => (w0, w1),
        ByteOrder::LittleEndian => (w1, w0),
        ByteOrder::MixedBadc => (w0.swap_bytes(), w1.swap_bytes()),
        ByteOrder::MixedDcba => (w1.swap_bytes(), w0.swap_bytes()),
    };
    (u32::from(hi) << 16) | u32::from(lo)
}

/// Combines four registers into a 64-bit pattern; `MixedDcba` is rejected.
pub fn combine_u64(words: [u16; 4], order: ByteOrder) -> Result<u64, RtuError> {
    let ordered = match order {
        ByteOrder::BigEndian => words,
        ByteOrder::LittleEndian => [words[3], words[2], words[1], words[0]],
        ByteOrder::MixedBadc => words.map(u16::swap_bytes),
        ByteOrder::MixedDcba => {
            return Err(RtuError::InvalidArgument(
                "FLOAT64 does not support MIXED_DCBA".into(),
            ))
        }
    };
    Ok(ordered
        .iter()
        .fold(0u64, |acc, w| (acc << 16) | u64::from(*w)))
}

/// Decodes `words` per `descriptor` and multiplies by `scale`.
///
/// Only the leading registers the type needs are consumed. `Hex` ignores both
/// `scale` and the byte order; 16-bit types ignore the byte order.
pub fn decode(
    words: &[u16],
    descriptor: DecodeDescriptor,
    scale: f64,
) -> Result<DecodedValue, RtuError> {
    let DecodeDescriptor {
        data_type,
        byte_order,
    } = descriptor;
    ensure_words(words, data_type.register_count(), data_type)?;
    if !data_type.supports(byte_order) {
        return Err(RtuError::InvalidArgument(format!(
            "{data_type} does not support {byte_order}"
        )));
    }

    let value = match data_type {
        PrimitiveType::Uint16 => {
            let raw = words[0];
            DecodedValue {
                raw: u64::from(raw),
                scaled: f64::from(raw) * scale,
            }
        }
        PrimitiveType::Int16 => {
            let raw = words[0];
            DecodedValue {
                raw: u64::from(raw),
                scaled: f64::from(raw as i16) * scale,
            }
        }
        PrimitiveType::Uint32 => {
            let raw = combine_u32(words[0], words[1], byte_order);
            DecodedValue {
                raw: u64::from(raw),
                scaled: f64::from(raw) * scale,
            }
        }
        PrimitiveType::Int32 => {
            let raw = combine_u32(words[0], words[1], byte_order);
            DecodedValue {
                raw: u64::from(raw),
                scaled: f64::from(raw as i32) * scale,
            }
        }
        PrimitiveType::Float32 => {
            let raw = combine_u32(words[0], words[1], byte_order);
            DecodedValue {
                raw: u64::from(raw),
                scaled: f64::from(f32::from_bits(raw)) * scale,
            }
        }
        PrimitiveType::Float64 => {
            let raw = combine_u64([words[0], words[1], words[2], words[3]], byte_order)?;
            DecodedValue {
                raw,
                scaled: f64::from_bits(raw) * scale,
            }
        }
        PrimitiveType::Hex => {
            let raw = combine_u32(words[0], words[1], ByteOrder::BigEndian);
            DecodedValue {
                raw: u64::from(raw),
                scaled: f64::from(raw),
            }
        }
    };
    Ok(value)
}

/// Uppercase hex of the registers `data_type` consumes from `words`.
pub fn format_raw_hex(words: &[u16], data_type: PrimitiveType) -> String {
    let used = data_type.register_count().min(words.len());
    words_to_hex(&words[..used])
}

/// Splits a 32-bit pattern into the two registers that decode back to it.
pub fn encode_u32_words(value: u32, order: ByteOrder) -> [u16; 2] {
    let hi = (value >> 16) as u16;
    let lo = value as u16;
    match order {
        ByteOrder::BigEndian => [hi, lo],
        ByteOrder::LittleEndian => [lo, hi],
        ByteOrder::MixedBadc => [hi.swap_bytes(), lo.swap_bytes()],
        ByteOrder::MixedDcba => [lo.swap_bytes(), hi.swap_bytes()],
    }
}

pub fn encode_f32_words(value: f32, order: ByteOrder) -> Result<[u16; 2], RtuError> {
    if !PrimitiveType::Float32.supports(order) {
        return Err(RtuError::InvalidArgument(format!(
            "FLOAT32 does not support {order}"
        )));
    }
    Ok(encode_u32_words(value.to_bits(), order))
}

pub fn encode_f64_words(value: f64, order: ByteOrder) -> Result<[u16; 4], RtuError> {
    let bits = value.to_bits();
    let be = [
        (bits >> 48) as u16,
        (bits >> 32) as u16,
        (bits >> 16) as u16,
        bits as u16,
    ];
    match order {
        ByteOrder::BigEndian => Ok(be),
        ByteOrder::LittleEndian => Ok([be[3], be[2], be[1], be[0]]),
        ByteOrder::MixedBadc => Ok(be.map(u16::swap_bytes)),
        ByteOrder::MixedDcba => Err(RtuError::InvalidArgument(
            "FLOAT64 does not support MIXED_DCBA".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn desc(data_type: PrimitiveType, byte_order: ByteOrder) -> DecodeDescriptor {
        DecodeDescriptor::new(data_type, byte_order)
    }

    #[test]
    fn test_uint32_orders() {
        let words = [0x1234, 0x0000];
        let raw = |order| decode(&words, desc(PrimitiveType::Uint32, order), 1.0).unwrap().raw;
        assert_eq!(raw(ByteOrder::BigEndian), 0x1234_0000);
        assert_eq!(raw(ByteOrder::LittleEndian), 0x0000_1234);
        assert_eq!(raw(ByteOrder::MixedBadc), 0x3412_0000);
        assert_eq!(raw(ByteOrder::MixedDcba), 0x0000_3412);
    }

    #[test]
    fn test_signed_reinterpretation() {
        let v = decode(&[0xFFFE], desc(PrimitiveType::Int16, ByteOrder::BigEndian), 0.5).unwrap();
        assert_eq!(v.raw, 0xFFFE);
        assert_eq!(v.scaled, -1.0);

        let v = decode(
            &[0xFFFF, 0xFF9C],
            desc(PrimitiveType::Int32, ByteOrder::BigEndian),
            1.0,
        )
        .unwrap();
        assert_eq!(v.raw, 0xFFFF_FF9C);
        assert_eq!(v.scaled, -100.0);
    }

    #[test]
    fn test_float32_known_value() {
        let v = decode(
            &[0x3FC0, 0x0000],
            desc(PrimitiveType::Float32, ByteOrder::BigEndian),
            1.0,
        )
        .unwrap();
        assert_eq!(v.scaled, 1.5);
        assert_eq!(v.raw, 0x3FC0_0000);

        let swapped = decode(
            &[0x0000, 0x3FC0],
            desc(PrimitiveType::Float32, ByteOrder::LittleEndian),
            2.0,
        )
        .unwrap();
        assert_eq!(swapped.scaled, 3.0);
    }

    #[test]
    fn test_float64_orders() {
        let be = encode_f64_words(-273.15, ByteOrder::BigEndian).unwrap();
        assert_eq!(be, [0xC071, 0x1266, 0x6666, 0x6666]);
        for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian, ByteOrder::MixedBadc] {
            let words = encode_f64_words(-273.15, order).unwrap();
            let v = decode(&words, desc(PrimitiveType::Float64, order), 1.0).unwrap();
            assert_eq!(v.scaled, -273.15, "{order}");
        }
    }

    #[test]
    fn test_unsupported_float_orders() {
        assert!(matches!(
            decode(&[0, 0], desc(PrimitiveType::Float32, ByteOrder::MixedBadc), 1.0),
            Err(RtuError::InvalidArgument(_))
        ));
        assert!(decode(&[0; 4], desc(PrimitiveType::Float64, ByteOrder::MixedDcba), 1.0).is_err());
        assert!(encode_f32_words(1.0, ByteOrder::MixedDcba).is_err());
    }

    #[test]
    fn test_insufficient_words() {
        let cases = [
            (PrimitiveType::Uint16, 0),
            (PrimitiveType::Int32, 1),
            (PrimitiveType::Hex, 1),
            (PrimitiveType::Float64, 3),
        ];
        for (ty, n) in cases {
            let words = vec![0u16; n];
            assert!(
                matches!(
                    decode(&words, desc(ty, ByteOrder::BigEndian), 1.0),
                    Err(RtuError::InvalidArgument(_))
                ),
                "{ty}"
            );
        }
    }

    #[test]
    fn test_hex_ignores_scale_and_order() {
        let v = decode(&[0xDEAD, 0xBEEF], desc(PrimitiveType::Hex, ByteOrder::MixedDcba), 0.1)
            .unwrap();
        assert_eq!(v.raw, 0xDEAD_BEEF);
        assert_eq!(v.scaled, f64::from(0xDEAD_BEEFu32));
    }

    #[test]
    fn test_format_raw_hex_uses_consumed_words() {
        let words = [0x0102, 0x0304, 0x0506];
        assert_eq!(format_raw_hex(&words, PrimitiveType::Uint16), "0102");
        assert_eq!(format_raw_hex(&words, PrimitiveType::Float32), "01020304");
        assert_eq!(format_raw_hex(&words, PrimitiveType::Float64), "010203040506");
    }

    proptest! {
        #[test]
        fn prop_u32_encode_decode(value in any::<u32>(), order_idx in 0usize..4) {
            let order = [
                ByteOrder::BigEndian,
                ByteOrder::LittleEndian,
                ByteOrder::MixedBadc,
                ByteOrder::MixedDcba,
            ][order_idx];
            let words = encode_u32_words(value, order);
            let v = decode(&words, desc(PrimitiveType::Uint32, order), 1.0).unwrap();
            prop_assert_eq!(v.raw, u64::from(value));
        }

        #[test]
        fn prop_f32_bit_exact(bits in any::<u32>(), little in any::<bool>()) {
            let value = f32::from_bits(bits);
            prop_assume!(value.is_finite());
            let order = if little { ByteOrder::LittleEndian } else { ByteOrder::BigEndian };
            let words = encode_f32_words(value, order).unwrap();
            let v = decode(&words, desc(PrimitiveType::Float32, order), 1.0).unwrap();
            prop_assert_eq!(v.raw, u64::from(bits));
            prop_assert_eq!(v.scaled, f64::from(value));
        }

        #[test]
        fn prop_decode_never_panics(words in proptest::collection::vec(any::<u16>(), 0..6)) {
            for ty in [
                PrimitiveType::Uint16,
                PrimitiveType::Int16,
                PrimitiveType::Uint32,
                PrimitiveType::Int32,
                PrimitiveType::Float32,
                PrimitiveType::Float64,
                PrimitiveType::Hex,
            ] {
                let result = decode(&words, desc(ty, ByteOrder::BigEndian), 1.0);
                prop_assert_eq!(result.is_ok(), words.len() >= ty.register_count());
            }
        }
    }
}
