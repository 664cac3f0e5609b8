/// Fixed-point binary encoding of the telemetry record broadcast on the air
use thiserror::Error;

// Wire protocol constants, shared between broadcaster and collector
pub const COMPANY_ID: u16 = 0x0822; // Manufacturer-data namespace for our nodes
pub const PRODUCT_TAG: u16 = 0xABCD; // Distinguishes this record format within the namespace
pub const WIRE_SIZE: usize = 10; // Encoded record size in bytes

/// Decoding failures for raw advertisement payloads
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is {0} bytes, expected {}", WIRE_SIZE)]
    SizeMismatch(usize),
}

/// Decoded telemetry record as carried on the wire
///
/// Temperatures are kept in their quantized form (°C × 10); use the
/// accessor methods for unit-correct values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub product_tag: u16,
    pub temp_primary_raw: i16,
    pub pressure: u16,
    pub temp_secondary_raw: i16,
    pub humidity: u16,
}

impl TelemetryRecord {
    /// Primary temperature in °C
    pub fn temp_primary(&self) -> f32 {
        self.temp_primary_raw as f32 / 10.0
    }

    /// Secondary temperature in °C
    pub fn temp_secondary(&self) -> f32 {
        self.temp_secondary_raw as f32 / 10.0
    }
}

/// Encode physical readings into the fixed 10-byte wire record
///
/// The record layout is little-endian with the following structure:
/// - Bytes 0-1: Product tag (unsigned 16-bit)
/// - Bytes 2-3: Primary temperature (signed 16-bit, °C × 10)
/// - Bytes 4-5: Primary pressure (unsigned 16-bit, hPa)
/// - Bytes 6-7: Secondary temperature (signed 16-bit, °C × 10)
/// - Bytes 8-9: Secondary humidity (unsigned 16-bit, % RH)
///
/// Temperatures are quantized by multiplying by 10 and truncating toward
/// zero, giving one decimal of precision. Pressure and humidity are
/// truncated to whole units. Physical plausibility is the caller's
/// responsibility; values outside the 16-bit ranges are a caller error.
pub fn encode(
    temp_primary: f32,
    pressure: f32,
    temp_secondary: f32,
    humidity: f32,
    product_tag: u16,
) -> [u8; WIRE_SIZE] {
    let t_primary = (temp_primary * 10.0) as i16;
    let t_secondary = (temp_secondary * 10.0) as i16;
    let p = pressure as u16;
    let h = humidity as u16;

    let mut buf = [0u8; WIRE_SIZE];
    buf[0..2].copy_from_slice(&product_tag.to_le_bytes());
    buf[2..4].copy_from_slice(&t_primary.to_le_bytes());
    buf[4..6].copy_from_slice(&p.to_le_bytes());
    buf[6..8].copy_from_slice(&t_secondary.to_le_bytes());
    buf[8..10].copy_from_slice(&h.to_le_bytes());
    buf
}

/// Decode a raw manufacturer-data payload into a telemetry record
///
/// Some transports prepend a single length byte to the payload; an input of
/// 11 bytes is treated as a prefixed record and the first byte is stripped.
/// Any other length than 10 or 11 fails with `SizeMismatch`. Once the size
/// matches, unpacking cannot fail: every field is a fixed-width integer.
///
/// The product tag is decoded but deliberately not checked here; telling
/// our records apart from other payloads sharing the company id is the
/// caller's validation step.
pub fn decode(payload: &[u8]) -> Result<TelemetryRecord, DecodeError> {
    let payload = if payload.len() == WIRE_SIZE + 1 {
        &payload[1..]
    } else {
        payload
    };

    if payload.len() != WIRE_SIZE {
        return Err(DecodeError::SizeMismatch(payload.len()));
    }

    Ok(TelemetryRecord {
        product_tag: u16::from_le_bytes([payload[0], payload[1]]),
        temp_primary_raw: i16::from_le_bytes([payload[2], payload[3]]),
        pressure: u16::from_le_bytes([payload[4], payload[5]]),
        temp_secondary_raw: i16::from_le_bytes([payload[6], payload[7]]),
        humidity: u16::from_le_bytes([payload[8], payload[9]]),
    })
}
