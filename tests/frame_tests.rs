//! Frame building and response validation against known wire captures.

use rtu_telemetry::constants::{
    FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS, FC_WRITE_MULTIPLE_REGISTERS,
};
use rtu_telemetry::rtu::crc::{append_crc, crc16, crc16_wire, stored_crc, verify};
use rtu_telemetry::rtu::frame::{
    build_read, build_write_multiple, build_write_single, parse_response, ResponsePdu,
};
use rtu_telemetry::RtuError;

/// Tests CRC values of reference frames and their wire byte order.
#[test]
fn test_crc_reference_vectors() {
    let cases: [(&[u8], u16); 4] = [
        (&[0x01, 0x03, 0x00, 0x00, 0x00, 0x02], 0x0BC4),
        (&[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A], 0xCDC5),
        (&[0x01, 0x06, 0x00, 0x01, 0x00, 0x03], 0x0B98),
        (&[0x01, 0x03, 0x04, 0x12, 0x34, 0x56, 0x78], 0x0781),
    ];
    for (bytes, expected) in cases {
        assert_eq!(crc16(bytes), expected, "{bytes:02X?}");
        assert_eq!(crc16_wire(bytes), expected.to_le_bytes());
    }
}

/// Tests that any single flipped byte breaks verification.
#[test]
fn test_verify_detects_flipped_byte() {
    let mut frame = vec![0x11, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02];
    append_crc(&mut frame);
    assert_eq!(&frame[11..], &[0xC6, 0xF0]);
    assert!(verify(&frame));
    assert_eq!(stored_crc(&frame), Some(0xF0C6));

    for i in 0..frame.len() {
        let mut corrupted = frame.clone();
        corrupted[i] ^= 0x20;
        assert!(!verify(&corrupted), "flip at byte {i} went unnoticed");
    }
}

/// Tests that frames shorter than a CRC never verify.
#[test]
fn test_verify_short_frames() {
    assert!(!verify(&[]));
    assert!(!verify(&[0x01]));
    assert_eq!(stored_crc(&[0x01]), None);
}

/// Tests the read request for input registers.
#[test]
fn test_build_read_input() {
    let frame = build_read(0x01, FC_READ_INPUT_REGISTERS, 0x0000, 0x000A).unwrap();
    assert_eq!(
        frame.as_bytes(),
        &[0x01, 0x04, 0x00, 0x00, 0x00, 0x0A, 0x70, 0x0D]
    );
}

/// Tests the write-single request against a captured frame.
#[test]
fn test_build_write_single_reference() {
    let frame = build_write_single(0x01, 0x0001, 0x0003);
    assert_eq!(
        frame.into_vec(),
        vec![0x01, 0x06, 0x00, 0x01, 0x00, 0x03, 0x98, 0x0B]
    );
}

/// Tests the write-multiple request header and length.
#[test]
fn test_build_write_multiple_reference() {
    let frame = build_write_multiple(0x11, 0x0001, &[0x000A, 0x0102]).unwrap();
    assert_eq!(
        frame.as_bytes(),
        &[0x11, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02, 0xC6, 0xF0]
    );
}

/// Tests that validation order puts CRC ahead of the exception flag.
#[test]
fn test_crc_checked_before_exception() {
    let mut raw = vec![0x01, 0x83, 0x02];
    append_crc(&mut raw);
    raw[2] = 0x03;
    assert!(matches!(
        parse_response(&raw, 0x01, FC_READ_HOLDING_REGISTERS),
        Err(RtuError::InvalidCrc { .. })
    ));
}

/// Tests rejection of an odd byte count.
#[test]
fn test_odd_byte_count_rejected() {
    let mut raw = vec![0x01, 0x03, 0x03, 0x12, 0x34, 0x56];
    append_crc(&mut raw);
    assert!(matches!(
        parse_response(&raw, 0x01, FC_READ_HOLDING_REGISTERS),
        Err(RtuError::MalformedResponse(_))
    ));
}

/// Tests the write-multiple echo body.
#[test]
fn test_parse_write_multiple_echo() {
    let mut raw = vec![0x11, 0x10, 0x00, 0x01, 0x00, 0x02];
    append_crc(&mut raw);
    assert_eq!(
        parse_response(&raw, 0x11, FC_WRITE_MULTIPLE_REGISTERS).unwrap(),
        ResponsePdu::WriteMultiple {
            start: 0x0001,
            quantity: 2
        }
    );
}

/// Tests a large read response of the maximum register count.
#[test]
fn test_parse_max_read_response() {
    let mut raw = vec![0x01, 0x04, 250];
    for i in 0..125u16 {
        raw.extend_from_slice(&i.to_be_bytes());
    }
    append_crc(&mut raw);
    match parse_response(&raw, 0x01, FC_READ_INPUT_REGISTERS).unwrap() {
        ResponsePdu::Registers(words) => {
            assert_eq!(words.len(), 125);
            assert_eq!(words[124], 124);
        }
        other => panic!("unexpected body {other:?}"),
    }
}
