use bluer::Address;
use std::collections::HashMap;
use time::OffsetDateTime;

/// One observed advertisement, as delivered by the scanning side
#[derive(Debug, Clone)]
pub struct AdvertisementEvent {
    pub identity: Address,
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    pub rssi: i16,
}

/// A decoded, admitted reading ready for persistence
#[derive(Debug, Clone)]
pub struct SensorReading {
    pub identity: Address,
    pub location: String,
    pub temp_primary: f32,
    pub pressure: u16,
    pub temp_secondary: f32,
    pub humidity: u16,
    pub rssi: i16,
    pub timestamp: OffsetDateTime,
}
