//! # Sensor Acquisition
//!
//! Turns a [`SensorProfile`] into a [`Reading`] by driving the exchange engine
//! and the decoders.
//!
//! Single-value profiles propagate the first failure to the caller. Composite
//! profiles read every enabled sub-channel independently: one channel failing
//! does not stop its siblings, and a channel that could not be read keeps the
//! caller-supplied default rather than reporting zero. A composite reading is
//! valid when at least one channel decoded.
//!
//! Nothing here retries; the scheduler that decides when to poll owns that.

use crate::error::{ExchangeResult, RtuError};
use crate::payload::{decode, format_raw_hex, ChannelSlot, ChannelValues, Reading};
use crate::rtu::{ExchangeEngine, TransportPort};
use crate::sensor::profile::{SensorProfile, SubChannel};
use crate::util::hex::words_to_hex;
use crate::vendors::VendorRegistry;
use log::{debug, warn};

/// Reads and decodes one single-value sensor.
pub async fn poll_sensor<P: TransportPort>(
    engine: &mut ExchangeEngine<P>,
    profile: &SensorProfile,
    vendors: &VendorRegistry,
) -> ExchangeResult<Reading> {
    engine.set_baud(profile.baud_rate).await?;

    let (decoded, raw_hex) = match &profile.family {
        Some(family) => {
            let decoder = family.decoder(vendors)?;
            let count = decoder.register_count(&profile.descriptor);
            let quantity = u16::try_from(count).map_err(|_| {
                RtuError::InvalidArgument(format!("{} register span {count}", decoder.family()))
            })?;
            let words = engine
                .read_registers(profile.slave_id, profile.bank, profile.start_register, quantity)
                .await?;
            let decoded = decoder.decode(&words, &profile.descriptor, profile.scale)?;
            debug!(
                "{}: {} decoded {} from {} registers",
                profile.unit_id,
                decoder.family(),
                decoded.scaled,
                words.len()
            );
            (decoded, words_to_hex(&words))
        }
        None => {
            let words = engine
                .read_registers(
                    profile.slave_id,
                    profile.bank,
                    profile.start_register,
                    profile.register_count,
                )
                .await?;
            let decoded = decode(&words, profile.descriptor, profile.scale)?;
            (decoded, format_raw_hex(&words, profile.descriptor.data_type))
        }
    };

    Ok(Reading {
        unit_id: profile.unit_id.clone(),
        value: decoded.scaled,
        raw: decoded.raw,
        raw_hex,
        valid: true,
        timestamp: None,
        channels: None,
    })
}

async fn poll_channel<P: TransportPort>(
    engine: &mut ExchangeEngine<P>,
    channel: &SubChannel,
) -> ExchangeResult<(f64, u64, String)> {
    let words = engine
        .read_registers(
            channel.slave_id,
            channel.bank,
            channel.start_register,
            channel.register_count,
        )
        .await?;
    let decoded = decode(&words, channel.descriptor, channel.scale)?;
    Ok((
        decoded.scaled,
        decoded.raw,
        format_raw_hex(&words, channel.descriptor.data_type),
    ))
}

/// Reads every enabled sub-channel of a composite sensor.
///
/// Never fails as a whole: per-channel errors are logged and the affected
/// slots keep their value from `defaults`. `value`, `raw` and `raw_hex` come
/// from the first channel that decoded.
pub async fn poll_channels<P: TransportPort>(
    engine: &mut ExchangeEngine<P>,
    profile: &SensorProfile,
    defaults: &ChannelValues,
) -> Reading {
    let mut reading = Reading::invalid(profile.unit_id.clone());
    let mut values = *defaults;

    if let Err(e) = engine.set_baud(profile.baud_rate).await {
        warn!("{}: cannot switch to {} baud: {e}", profile.unit_id, profile.baud_rate);
        reading.channels = Some(values);
        return reading;
    }

    let mut decoded_channels = 0usize;
    for channel in profile.sub_channels.iter().filter(|c| c.enabled) {
        let slot = match channel.name.parse::<ChannelSlot>() {
            Ok(slot) => slot,
            Err(_) => {
                warn!(
                    "{}: ignoring channel '{}' with no output slot",
                    profile.unit_id, channel.name
                );
                continue;
            }
        };

        match poll_channel(engine, channel).await {
            Ok((value, raw, raw_hex)) => {
                values.set(slot, value);
                if decoded_channels == 0 {
                    reading.value = value;
                    reading.raw = raw;
                    reading.raw_hex = raw_hex;
                }
                decoded_channels += 1;
            }
            Err(e) => warn!(
                "{}: channel {slot} failed, keeping {}: {e}",
                profile.unit_id,
                values.get(slot)
            ),
        }
    }

    debug!(
        "{}: {decoded_channels} of {} channels decoded",
        profile.unit_id,
        profile.sub_channels.len()
    );
    reading.valid = decoded_channels > 0;
    reading.channels = Some(values);
    reading
}

/// Polls a profile in whichever mode it describes.
pub async fn poll_profile<P: TransportPort>(
    engine: &mut ExchangeEngine<P>,
    profile: &SensorProfile,
    vendors: &VendorRegistry,
    defaults: &ChannelValues,
) -> ExchangeResult<Reading> {
    if profile.is_composite() {
        Ok(poll_channels(engine, profile, defaults).await)
    } else {
        poll_sensor(engine, profile, vendors).await
    }
}
