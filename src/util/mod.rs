//! # Utility Modules
//!
//! Hex formatting shared by frame logging and the `Reading` diagnostics.

pub mod hex;

pub use hex::{decode_hex, format_hex_compact, log_frame_hex, words_to_hex};
