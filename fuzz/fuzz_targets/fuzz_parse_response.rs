#![no_main]

use libfuzzer_sys::fuzz_target;
use rtu_telemetry::rtu::crc::append_crc;
use rtu_telemetry::rtu::frame::parse_response;

fuzz_target!(|data: &[u8]| {
    // The parser should reject any malformed input without panicking
    if data.len() < 2 {
        let _ = parse_response(data, 0x01, 0x03);
        return;
    }
    let slave = data[0];
    let function = data[1] & 0x7F;
    let _ = parse_response(data, slave, function);

    // Re-seal with a valid CRC so the body parsers are reached
    let mut sealed = data.to_vec();
    append_crc(&mut sealed);
    for fc in [0x03, 0x04, 0x06, 0x10] {
        let _ = parse_response(&sealed, slave, fc);
    }
});
