//! Level transmitter families.
//!
//! The magnitude is decoded with the profile's generic descriptor and scale,
//! then expressed as a percentage of the tank span. Bounded families saturate
//! at both ends; `LevelOverRange` only saturates at zero so an overflowing
//! tank shows up as a value above 100.

use crate::error::RtuError;
use crate::payload::{decode, DecodeDescriptor, DecodedValue};
use crate::vendors::VendorDecoder;

pub(crate) fn check_span(span: f64) -> Result<f64, RtuError> {
    if !span.is_finite() || span <= 0.0 {
        return Err(RtuError::InvalidArgument(format!(
            "level span must be positive, got {span}"
        )));
    }
    Ok(span)
}

pub(crate) fn check_reference(reference_height: f64) -> Result<f64, RtuError> {
    if !reference_height.is_finite() {
        return Err(RtuError::InvalidArgument(format!(
            "reference height must be finite, got {reference_height}"
        )));
    }
    Ok(reference_height)
}

fn percentage(
    words: &[u16],
    descriptor: &DecodeDescriptor,
    scale: f64,
    to_percent: impl Fn(f64) -> f64,
    upper_bound: bool,
) -> Result<DecodedValue, RtuError> {
    let magnitude = decode(words, *descriptor, scale)?;
    let pct = to_percent(magnitude.scaled);
    if pct.is_nan() {
        return Err(RtuError::MalformedResponse("level is not a number".into()));
    }
    let pct = if upper_bound {
        pct.clamp(0.0, 100.0)
    } else {
        pct.max(0.0)
    };
    Ok(DecodedValue {
        raw: magnitude.raw,
        scaled: pct,
    })
}

/// Distance measured down from a mounting point: `(reference - d) / span`.
#[derive(Debug, Clone, Copy)]
pub struct LevelFromReference {
    reference_height: f64,
    span: f64,
}

impl LevelFromReference {
    pub fn new(reference_height: f64, span: f64) -> Result<Self, RtuError> {
        Ok(LevelFromReference {
            reference_height: check_reference(reference_height)?,
            span: check_span(span)?,
        })
    }
}

impl VendorDecoder for LevelFromReference {
    fn family(&self) -> &'static str {
        "level_from_reference"
    }

    fn register_count(&self, descriptor: &DecodeDescriptor) -> usize {
        descriptor.register_count()
    }

    fn decode(
        &self,
        words: &[u16],
        descriptor: &DecodeDescriptor,
        scale: f64,
    ) -> Result<DecodedValue, RtuError> {
        percentage(
            words,
            descriptor,
            scale,
            |d| (self.reference_height - d) / self.span * 100.0,
            true,
        )
    }
}

/// Level reported directly: `level / span`, clamped to [0, 100].
#[derive(Debug, Clone, Copy)]
pub struct LevelPercentOfSpan {
    span: f64,
}

impl LevelPercentOfSpan {
    pub fn new(span: f64) -> Result<Self, RtuError> {
        Ok(LevelPercentOfSpan {
            span: check_span(span)?,
        })
    }
}

impl VendorDecoder for LevelPercentOfSpan {
    fn family(&self) -> &'static str {
        "level_percent_of_span"
    }

    fn register_count(&self, descriptor: &DecodeDescriptor) -> usize {
        descriptor.register_count()
    }

    fn decode(
        &self,
        words: &[u16],
        descriptor: &DecodeDescriptor,
        scale: f64,
    ) -> Result<DecodedValue, RtuError> {
        percentage(words, descriptor, scale, |l| l / self.span * 100.0, true)
    }
}

/// Like [`LevelPercentOfSpan`] but over-range passes through.
#[derive(Debug, Clone, Copy)]
pub struct LevelOverRange {
    span: f64,
}

impl LevelOverRange {
    pub fn new(span: f64) -> Result<Self, RtuError> {
        Ok(LevelOverRange {
            span: check_span(span)?,
        })
    }
}

impl VendorDecoder for LevelOverRange {
    fn family(&self) -> &'static str {
        "level_over_range"
    }

    fn register_count(&self, descriptor: &DecodeDescriptor) -> usize {
        descriptor.register_count()
    }

    fn decode(
        &self,
        words: &[u16],
        descriptor: &DecodeDescriptor,
        scale: f64,
    ) -> Result<DecodedValue, RtuError> {
        percentage(words, descriptor, scale, |l| l / self.span * 100.0, false)
    }
}
