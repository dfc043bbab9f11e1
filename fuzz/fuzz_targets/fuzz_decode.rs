#![no_main]

use libfuzzer_sys::fuzz_target;
use rtu_telemetry::payload::{decode, ByteOrder, DecodeDescriptor, PrimitiveType};
use rtu_telemetry::vendors::{SensorFamily, VendorRegistry};

const TYPES: [PrimitiveType; 7] = [
    PrimitiveType::Uint16,
    PrimitiveType::Int16,
    PrimitiveType::Uint32,
    PrimitiveType::Int32,
    PrimitiveType::Float32,
    PrimitiveType::Float64,
    PrimitiveType::Hex,
];

const ORDERS: [ByteOrder; 4] = [
    ByteOrder::BigEndian,
    ByteOrder::LittleEndian,
    ByteOrder::MixedBadc,
    ByteOrder::MixedDcba,
];

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let selector = data[0];
    let words: Vec<u16> = data[1..]
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();

    let descriptor = DecodeDescriptor::new(
        TYPES[usize::from(selector) % TYPES.len()],
        ORDERS[usize::from(selector >> 4) % ORDERS.len()],
    );
    let _ = decode(&words, descriptor, 1.0);

    let registry = VendorRegistry::new();
    for family in [
        SensorFamily::TotalizerIntFloat,
        SensorFamily::TotalizerShortInt,
        SensorFamily::WideDouble,
        SensorFamily::LevelFromReference { reference_height: 10.0, span: 8.0 },
        SensorFamily::LevelOverRange { span: 8.0 },
    ] {
        if let Ok(decoder) = family.decoder(&registry) {
            let _ = decoder.decode(&words, &descriptor, 0.1);
        }
    }
});
