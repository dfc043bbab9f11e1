//! The payload module contains the register decoding layer: descriptors that
//! name a type and byte order, the word-to-value conversions, and the
//! `Reading` output record.

pub mod data_encoding;
pub mod descriptor;
pub mod record;

pub use data_encoding::{
    decode, encode_f32_words, encode_f64_words, encode_u32_words, format_raw_hex, DecodedValue,
};
pub use descriptor::{ByteOrder, DecodeDescriptor, PrimitiveType};
pub use record::{ChannelSlot, ChannelValues, Reading};
