//! # Hex Formatting Utilities
//!
//! Hex rendering for frame logging and for the raw-register diagnostic string
//! carried by every `Reading`.
//!
//! ```rust
//! use rtu_telemetry::util::hex::{format_hex_compact, words_to_hex};
//!
//! assert_eq!(format_hex_compact(&[0x01, 0x03, 0x0B]), "01 03 0B");
//! assert_eq!(words_to_hex(&[0x1234, 0x00AB]), "123400AB");
//! ```

use crate::error::RtuError;

/// Largest frame prefix written to the log
const MAX_LOG_BYTES: usize = 64;

/// Space-separated uppercase bytes, as frames are usually shown on a bus analyzer.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Register words in wire order as one uppercase hex string.
pub fn words_to_hex(words: &[u16]) -> String {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    hex::encode_upper(bytes)
}

/// Parses a hex string (whitespace ignored) into bytes.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, RtuError> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&cleaned).map_err(|e| RtuError::InvalidArgument(format!("bad hex '{input}': {e}")))
}

/// Logs frame bytes at debug level, truncated to keep the log readable.
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };
    log::debug!("{prefix}: {}{suffix}", format_hex_compact(shown));
}
