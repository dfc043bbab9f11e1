//! Flow totalizer and wide-double families.
//!
//! Totalizers keep a cumulative volume as an unsigned integer part plus an
//! IEEE-754 float fraction in a four-register span. Vendors disagree on the
//! word order of each half, hence one type per layout. The reported raw value
//! is the four registers concatenated big-endian so the whole span can be
//! reconstructed from diagnostics.

use crate::constants::VENDOR_REGISTER_SPAN;
use crate::error::RtuError;
use crate::payload::data_encoding::{combine_u32, combine_u64};
use crate::payload::{ByteOrder, DecodeDescriptor, DecodedValue};
use crate::vendors::VendorDecoder;

fn span(words: &[u16], family: &str) -> Result<[u16; 4], RtuError> {
    match words {
        [a, b, c, d, ..] => Ok([*a, *b, *c, *d]),
        _ => Err(RtuError::InvalidArgument(format!(
            "{family} needs {VENDOR_REGISTER_SPAN} registers, got {}",
            words.len()
        ))),
    }
}

fn totalize(
    words: [u16; 4],
    integer: f64,
    fraction: f32,
    scale: f64,
) -> Result<DecodedValue, RtuError> {
    if !fraction.is_finite() {
        return Err(RtuError::MalformedResponse(format!(
            "totalizer fraction is not a number ({fraction})"
        )));
    }
    Ok(DecodedValue {
        raw: combine_u64(words, ByteOrder::BigEndian)?,
        scaled: (integer + f64::from(fraction)) * scale,
    })
}

/// u32 integer in big-endian word order, f32 fraction word-swapped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalizerIntFloat;

impl VendorDecoder for TotalizerIntFloat {
    fn family(&self) -> &'static str {
        "totalizer_int_float"
    }

    fn register_count(&self, _descriptor: &DecodeDescriptor) -> usize {
        VENDOR_REGISTER_SPAN
    }

    fn decode(
        &self,
        words: &[u16],
        _descriptor: &DecodeDescriptor,
        scale: f64,
    ) -> Result<DecodedValue, RtuError> {
        let w = span(words, self.family())?;
        let integer = combine_u32(w[0], w[1], ByteOrder::BigEndian);
        let fraction = f32::from_bits(combine_u32(w[2], w[3], ByteOrder::LittleEndian));
        totalize(w, f64::from(integer), fraction, scale)
    }
}

/// u32 integer word-swapped, f32 fraction in big-endian word order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalizerIntFloatSwapped;

impl VendorDecoder for TotalizerIntFloatSwapped {
    fn family(&self) -> &'static str {
        "totalizer_int_float_swapped"
    }

    fn register_count(&self, _descriptor: &DecodeDescriptor) -> usize {
        VENDOR_REGISTER_SPAN
    }

    fn decode(
        &self,
        words: &[u16],
        _descriptor: &DecodeDescriptor,
        scale: f64,
    ) -> Result<DecodedValue, RtuError> {
        let w = span(words, self.family())?;
        let integer = combine_u32(w[0], w[1], ByteOrder::LittleEndian);
        let fraction = f32::from_bits(combine_u32(w[2], w[3], ByteOrder::BigEndian));
        totalize(w, f64::from(integer), fraction, scale)
    }
}

/// u16 integer in the first register, big-endian f32 fraction in the next two.
/// The fourth register is read but unused.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalizerShortInt;

impl VendorDecoder for TotalizerShortInt {
    fn family(&self) -> &'static str {
        "totalizer_short_int"
    }

    fn register_count(&self, _descriptor: &DecodeDescriptor) -> usize {
        VENDOR_REGISTER_SPAN
    }

    fn decode(
        &self,
        words: &[u16],
        _descriptor: &DecodeDescriptor,
        scale: f64,
    ) -> Result<DecodedValue, RtuError> {
        let w = span(words, self.family())?;
        let fraction = f32::from_bits(combine_u32(w[1], w[2], ByteOrder::BigEndian));
        totalize(w, f64::from(w[0]), fraction, scale)
    }
}

/// Four registers big-endian as one IEEE-754 double.
#[derive(Debug, Clone, Copy, Default)]
pub struct WideDouble;

impl VendorDecoder for WideDouble {
    fn family(&self) -> &'static str {
        "wide_double"
    }

    fn register_count(&self, _descriptor: &DecodeDescriptor) -> usize {
        VENDOR_REGISTER_SPAN
    }

    fn decode(
        &self,
        words: &[u16],
        _descriptor: &DecodeDescriptor,
        scale: f64,
    ) -> Result<DecodedValue, RtuError> {
        let w = span(words, self.family())?;
        let raw = combine_u64(w, ByteOrder::BigEndian)?;
        Ok(DecodedValue {
            raw,
            scaled: f64::from_bits(raw) * scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> DecodeDescriptor {
        DecodeDescriptor::default()
    }

    #[test]
    fn test_int_float_layout() {
        // 1000 + 0.25
        let words = [0x0000, 0x03E8, 0x0000, 0x3E80];
        let v = TotalizerIntFloat.decode(&words, &descriptor(), 1.0).unwrap();
        assert_eq!(v.scaled, 1000.25);
        assert_eq!(v.raw, 0x0000_03E8_0000_3E80);
    }

    #[test]
    fn test_int_float_swapped_layout() {
        // 70000 word-swapped, 0.5 big-endian
        let words = [0x1170, 0x0001, 0x3F00, 0x0000];
        let v = TotalizerIntFloatSwapped.decode(&words, &descriptor(), 0.1).unwrap();
        assert!((v.scaled - 7000.05).abs() < 1e-9);
    }

    #[test]
    fn test_short_int_layout() {
        let words = [0x0064, 0x3F40, 0x0000, 0xFFFF];
        let v = TotalizerShortInt.decode(&words, &descriptor(), 1.0).unwrap();
        assert_eq!(v.scaled, 100.75);
    }

    #[test]
    fn test_wide_double() {
        let v = WideDouble
            .decode(&[0x4059, 0x0000, 0x0000, 0x0000], &descriptor(), 2.0)
            .unwrap();
        assert_eq!(v.scaled, 200.0);
        assert_eq!(v.raw, 0x4059_0000_0000_0000);
    }

    #[test]
    fn test_short_span_and_nan_fraction() {
        assert!(matches!(
            TotalizerIntFloat.decode(&[0, 1, 2], &descriptor(), 1.0),
            Err(RtuError::InvalidArgument(_))
        ));
        let nan = [0x0000, 0x0001, 0x0000, 0x7FC0];
        assert!(matches!(
            TotalizerIntFloat.decode(&nan, &descriptor(), 1.0),
            Err(RtuError::MalformedResponse(_))
        ));
    }
}
