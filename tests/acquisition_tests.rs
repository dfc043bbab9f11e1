//! Multi-channel acquisition, degradation on partial failure, baud switching
//! between sensors and sharing one bus between tasks.

use rtu_telemetry::constants::FC_READ_HOLDING_REGISTERS;
use rtu_telemetry::payload::{ByteOrder, DecodeDescriptor, PrimitiveType};
use rtu_telemetry::{
    poll_channels, poll_profile, poll_sensor, ChannelValues, ExchangeEngine, MockTransport,
    RtuError, SensorProfile, SubChannel, VendorRegistry,
};

fn water_probe() -> SensorProfile {
    SensorProfile::new("probe-1", 0x01, 0)
        .with_sub_channel(SubChannel::new("ph", 0x01, 0x0000).with_scale(0.01))
        .with_sub_channel(SubChannel::new("temperature", 0x01, 0x0001).with_scale(0.1))
        .with_sub_channel(SubChannel::new("tds", 0x01, 0x0002))
        .with_sub_channel(SubChannel::new("humidity", 0x01, 0x0003).with_scale(0.1))
        .with_sub_channel(SubChannel::new("conductivity", 0x01, 0x0004).with_scale(0.1))
}

/// Tests that two failing channels keep their defaults while the rest update.
#[tokio::test]
async fn test_partial_failure_keeps_defaults() {
    let mock = MockTransport::new();
    mock.queue_registers(0x01, FC_READ_HOLDING_REGISTERS, &[712]);
    mock.queue_silence();
    mock.queue_registers(0x01, FC_READ_HOLDING_REGISTERS, &[350]);
    mock.queue_exception(0x01, FC_READ_HOLDING_REGISTERS, 0x02);
    mock.queue_registers(0x01, FC_READ_HOLDING_REGISTERS, &[1200]);
    let mut engine = ExchangeEngine::new(mock.clone());

    let reading = poll_channels(&mut engine, &water_probe(), &ChannelValues::default()).await;

    assert!(reading.valid);
    let channels = reading.channels.unwrap();
    assert!((channels.ph - 7.12).abs() < 1e-9);
    assert_eq!(channels.temperature, 25.0);
    assert_eq!(channels.tds, 350.0);
    assert_eq!(channels.humidity, 50.0);
    assert!((channels.conductivity - 120.0).abs() < 1e-9);

    // headline value comes from the first channel that decoded
    assert_eq!(reading.raw, 712);
    assert_eq!(reading.raw_hex, "02C8");

    let stats = engine.statistics();
    assert_eq!(stats.total_requests, 5);
    assert_eq!(stats.successful_requests, 3);
    assert_eq!(stats.failed_requests, 2);
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.protocol_exceptions, 1);
    assert_eq!(mock.get_tx_frames().len(), 5);
}

/// Tests that a reading with no decoded channel is invalid and carries the defaults.
#[tokio::test]
async fn test_all_channels_failing_is_invalid() {
    let mock = MockTransport::new();
    let mut engine = ExchangeEngine::new(mock);
    let defaults = ChannelValues {
        ph: 6.5,
        ..ChannelValues::default()
    };

    let reading = poll_channels(&mut engine, &water_probe(), &defaults).await;

    assert!(!reading.valid);
    assert_eq!(reading.channels, Some(defaults));
    assert_eq!(reading.raw_hex, "");
    assert_eq!(engine.statistics().timeouts, 5);
}

/// Tests that disabled channels are never polled.
#[tokio::test]
async fn test_disabled_channel_not_polled() {
    let mock = MockTransport::new();
    mock.queue_registers(0x01, FC_READ_HOLDING_REGISTERS, &[0x00FA]);
    let mut engine = ExchangeEngine::new(mock.clone());
    let profile = SensorProfile::new("probe-2", 0x01, 0)
        .with_sub_channel(SubChannel {
            enabled: false,
            ..SubChannel::new("ph", 0x01, 0x0000)
        })
        .with_sub_channel(SubChannel::new("temperature", 0x01, 0x0001).with_scale(0.1));

    let reading = poll_channels(&mut engine, &profile, &ChannelValues::default()).await;

    let channels = reading.channels.unwrap();
    assert_eq!(channels.ph, 7.0);
    assert!((channels.temperature - 25.0).abs() < 1e-9);
    let tx = mock.get_tx_frames();
    assert_eq!(tx.len(), 1);
    assert_eq!(&tx[0][2..4], &[0x00, 0x01]);
}

/// Tests a channel with a 32-bit float descriptor.
#[tokio::test]
async fn test_float_channel() {
    let mock = MockTransport::new();
    // 21.5 word-swapped
    mock.queue_registers(0x07, FC_READ_HOLDING_REGISTERS, &[0x0000, 0x41AC]);
    let mut engine = ExchangeEngine::new(mock.clone());
    let profile = SensorProfile::new("probe-3", 0x07, 0).with_sub_channel(
        SubChannel::new("temp", 0x07, 0x0020).with_descriptor(DecodeDescriptor::new(
            PrimitiveType::Float32,
            ByteOrder::LittleEndian,
        )),
    );

    let reading = poll_channels(&mut engine, &profile, &ChannelValues::default()).await;

    assert_eq!(reading.channels.unwrap().temperature, 21.5);
    assert_eq!(reading.value, 21.5);
    assert_eq!(&mock.last_tx_frame().unwrap()[4..6], &[0x00, 0x02]);
}

/// Tests that the bus switches rate only when consecutive sensors differ.
#[tokio::test]
async fn test_baud_switch_between_sensors() {
    let mock = MockTransport::new();
    for _ in 0..3 {
        mock.queue_registers(0x01, FC_READ_HOLDING_REGISTERS, &[1]);
    }
    let mut engine = ExchangeEngine::new(mock.clone());
    let vendors = VendorRegistry::new();
    let fast = SensorProfile::new("fast", 0x01, 0).with_baud_rate(19200);
    let slow = SensorProfile::new("slow", 0x01, 0);

    poll_sensor(&mut engine, &fast, &vendors).await.unwrap();
    poll_sensor(&mut engine, &fast, &vendors).await.unwrap();
    poll_sensor(&mut engine, &slow, &vendors).await.unwrap();

    assert_eq!(mock.baud_changes(), vec![19200, 9600]);
    assert_eq!(engine.baud_rate(), 9600);
    assert_eq!(engine.statistics().total_requests, 3);
}

/// Tests that a failed baud switch yields an invalid reading without traffic.
#[tokio::test]
async fn test_failed_baud_switch_skips_channels() {
    let mock = MockTransport::new();
    let mut engine = ExchangeEngine::new(mock.clone());
    let profile = water_probe().with_baud_rate(31250);

    let reading = poll_channels(&mut engine, &profile, &ChannelValues::default()).await;

    assert!(!reading.valid);
    assert_eq!(reading.channels, Some(ChannelValues::default()));
    assert!(mock.get_tx_frames().is_empty());
}

/// Tests that a single-value sensor propagates the device exception.
#[tokio::test]
async fn test_poll_sensor_propagates_exception() {
    let mock = MockTransport::new();
    mock.queue_exception(0x01, FC_READ_HOLDING_REGISTERS, 0x02);
    let mut engine = ExchangeEngine::new(mock);

    let result = poll_sensor(
        &mut engine,
        &SensorProfile::new("meter", 0x01, 0x9000),
        &VendorRegistry::new(),
    )
    .await;
    assert!(matches!(result, Err(RtuError::ProtocolException(0x02))));
}

/// Tests dispatch between single-value and composite profiles.
#[tokio::test]
async fn test_poll_profile_dispatch() {
    let mock = MockTransport::new();
    mock.queue_registers(0x01, FC_READ_HOLDING_REGISTERS, &[42]);
    let mut engine = ExchangeEngine::new(mock.clone());
    let vendors = VendorRegistry::new();
    let defaults = ChannelValues::default();

    let single = poll_profile(&mut engine, &SensorProfile::new("s", 0x01, 0), &vendors, &defaults)
        .await
        .unwrap();
    assert_eq!(single.value, 42.0);
    assert!(single.channels.is_none());

    // composite profiles never fail as a whole
    let composite = poll_profile(&mut engine, &water_probe(), &vendors, &defaults)
        .await
        .unwrap();
    assert!(!composite.valid);
    assert!(composite.channels.is_some());
}

/// Tests two tasks polling through one shared engine.
#[tokio::test]
async fn test_shared_engine_between_tasks() {
    let mock = MockTransport::new();
    mock.queue_registers(0x01, FC_READ_HOLDING_REGISTERS, &[0x0010]);
    mock.queue_registers(0x01, FC_READ_HOLDING_REGISTERS, &[0x0010]);
    let shared = ExchangeEngine::new(mock.clone()).into_shared();

    let mut handles = Vec::new();
    for unit in ["a", "b"] {
        let shared = shared.clone();
        handles.push(tokio::spawn(async move {
            let profile = SensorProfile::new(unit, 0x01, 0);
            let mut engine = shared.lock().await;
            poll_sensor(&mut *engine, &profile, &VendorRegistry::new()).await
        }));
    }
    for handle in handles {
        let reading = handle.await.unwrap().unwrap();
        assert_eq!(reading.value, 16.0);
    }

    assert_eq!(shared.lock().await.statistics().successful_requests, 2);
    assert_eq!(mock.get_tx_frames().len(), 2);
}
