/// Ingestion pipeline: advertisement event -> decode -> validate -> admit -> persist
use async_trait::async_trait;
use log::{debug, error, info};
use time::OffsetDateTime;

use crate::codec::{self, COMPANY_ID, PRODUCT_TAG};
use crate::models::{AdvertisementEvent, SensorReading};
use crate::resolver::LocationTable;
use crate::throttle::AdmissionThrottle;

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Persistence collaborator for admitted readings
#[async_trait]
pub trait ReadingStore {
    async fn append(&self, reading: &SensorReading) -> Result<(), StoreError>;
}

/// Decides, for every observed advertisement, whether a reading reaches
/// the store, and carries it there when it does.
///
/// Most observed advertisements belong to unrelated devices; the pipeline
/// drops those silently. Only real faults (a failing store) are logged
/// loudly.
pub struct IngestionPipeline<S> {
    throttle: AdmissionThrottle,
    locations: LocationTable,
    store: S,
}

impl<S: ReadingStore> IngestionPipeline<S> {
    pub fn new(locations: LocationTable, throttle: AdmissionThrottle, store: S) -> Self {
        IngestionPipeline {
            throttle,
            locations,
            store,
        }
    }

    /// Process one observed advertisement
    ///
    /// Admission policy, in order:
    /// 1. The manufacturer-data map must carry our company id.
    /// 2. The payload must decode as a telemetry record.
    /// 3. The record's product tag must match ours.
    /// 4. The per-device throttle must admit the reading.
    ///
    /// Steps 1-3 filter the foreign traffic that shares the broadcast
    /// medium; failing any of them is a silent no-op. The throttle check
    /// consumes the window before the store is called, so a failing store
    /// cannot cause a duplicate admission within one window; the reading
    /// is then lost, an accepted tradeoff for a best-effort stream.
    ///
    /// Returns the admitted reading, if any.
    pub async fn handle_event(
        &self,
        event: &AdvertisementEvent,
        now: OffsetDateTime,
    ) -> Option<SensorReading> {
        let payload = event.manufacturer_data.get(&COMPANY_ID)?;

        let record = codec::decode(payload).ok()?;
        if record.product_tag != PRODUCT_TAG {
            return None;
        }

        if !self.throttle.try_admit(event.identity, now) {
            debug!("Throttled reading from {}", event.identity);
            return None;
        }

        let reading = SensorReading {
            identity: event.identity,
            location: self.locations.resolve(event.identity),
            temp_primary: record.temp_primary(),
            pressure: record.pressure,
            temp_secondary: record.temp_secondary(),
            humidity: record.humidity,
            rssi: event.rssi,
            timestamp: now,
        };

        if let Err(e) = self.store.append(&reading).await {
            error!(
                "Failed to persist reading from {} ({}): {}",
                reading.identity, reading.location, e
            );
        } else {
            info!(
                "Saved: {} | {:.1}°C, {} hPa, {:.1}°C, {}% (RSSI {})",
                reading.location,
                reading.temp_primary,
                reading.pressure,
                reading.temp_secondary,
                reading.humidity,
                reading.rssi
            );
        }

        Some(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluer::Address;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use time::macros::datetime;
    use time::Duration;

    struct MemoryStore {
        readings: Mutex<Vec<SensorReading>>,
        fail: bool,
    }

    impl MemoryStore {
        fn new() -> Self {
            MemoryStore {
                readings: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            MemoryStore {
                readings: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl ReadingStore for &MemoryStore {
        async fn append(&self, reading: &SensorReading) -> Result<(), StoreError> {
            if self.fail {
                return Err("store unavailable".into());
            }
            self.readings.lock().unwrap().push(reading.clone());
            Ok(())
        }
    }

    fn sensor() -> Address {
        Address::new([0xE1, 0xBD, 0xF2, 0xF7, 0x60, 0x45])
    }

    fn pipeline(store: &MemoryStore) -> IngestionPipeline<&MemoryStore> {
        let mut locations = HashMap::new();
        locations.insert(sensor(), "garden".to_string());
        IngestionPipeline::new(
            LocationTable::new(locations),
            AdmissionThrottle::new(Duration::seconds(60)),
            store,
        )
    }

    fn event_with_payload(payload: Vec<u8>) -> AdvertisementEvent {
        let mut manufacturer_data = HashMap::new();
        manufacturer_data.insert(COMPANY_ID, payload);
        AdvertisementEvent {
            identity: sensor(),
            manufacturer_data,
            rssi: -67,
        }
    }

    fn valid_event() -> AdvertisementEvent {
        event_with_payload(codec::encode(22.5, 1013.0, 19.5, 47.0, PRODUCT_TAG).to_vec())
    }

    #[tokio::test]
    async fn test_foreign_company_id_is_ignored() {
        let store = MemoryStore::new();
        let pipeline = pipeline(&store);
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        let mut manufacturer_data = HashMap::new();
        manufacturer_data.insert(
            0x0499u16,
            codec::encode(22.5, 1013.0, 19.5, 47.0, PRODUCT_TAG).to_vec(),
        );
        let event = AdvertisementEvent {
            identity: sensor(),
            manufacturer_data,
            rssi: -67,
        };

        assert!(pipeline.handle_event(&event, t0).await.is_none());
        assert!(store.readings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_ignored() {
        let store = MemoryStore::new();
        let pipeline = pipeline(&store);
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        let event = event_with_payload(vec![0u8; 7]);

        assert!(pipeline.handle_event(&event, t0).await.is_none());
        assert!(store.readings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_product_tag_is_ignored() {
        let store = MemoryStore::new();
        let pipeline = pipeline(&store);
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        let event =
            event_with_payload(codec::encode(22.5, 1013.0, 19.5, 47.0, 0x1234).to_vec());

        assert!(pipeline.handle_event(&event, t0).await.is_none());
        assert!(store.readings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admitted_reading_is_persisted_with_correct_units() {
        let store = MemoryStore::new();
        let pipeline = pipeline(&store);
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        let reading = pipeline.handle_event(&valid_event(), t0).await.unwrap();

        assert_eq!(reading.location, "garden");
        assert!((reading.temp_primary - 22.5).abs() <= 0.1);
        assert_eq!(reading.pressure, 1013);
        assert!((reading.temp_secondary - 19.5).abs() <= 0.1);
        assert_eq!(reading.humidity, 47);
        assert_eq!(reading.rssi, -67);
        assert_eq!(reading.timestamp, t0);

        let stored = store.readings.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].location, "garden");
    }

    #[tokio::test]
    async fn test_repeat_within_window_is_not_persisted() {
        let store = MemoryStore::new();
        let pipeline = pipeline(&store);
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        assert!(pipeline.handle_event(&valid_event(), t0).await.is_some());
        assert!(pipeline
            .handle_event(&valid_event(), t0 + Duration::seconds(30))
            .await
            .is_none());
        assert!(pipeline
            .handle_event(&valid_event(), t0 + Duration::seconds(61))
            .await
            .is_some());

        assert_eq!(store.readings.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_identity_gets_fallback_location() {
        let store = MemoryStore::new();
        let pipeline = pipeline(&store);
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        let unknown = Address::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let mut event = valid_event();
        event.identity = unknown;

        let reading = pipeline.handle_event(&event, t0).await.unwrap();
        assert!(reading.location.contains(&unknown.to_string()));
    }

    #[tokio::test]
    async fn test_store_failure_loses_reading_but_consumes_window() {
        let store = MemoryStore::failing();
        let pipeline = pipeline(&store);
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        assert!(pipeline.handle_event(&valid_event(), t0).await.is_some());

        // No retry for the lost reading: the window was consumed.
        assert!(pipeline
            .handle_event(&valid_event(), t0 + Duration::seconds(30))
            .await
            .is_none());
        assert!(store.readings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_length_prefixed_payload_is_accepted() {
        let store = MemoryStore::new();
        let pipeline = pipeline(&store);
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        let mut payload = vec![0x0A];
        payload.extend_from_slice(&codec::encode(22.5, 1013.0, 19.5, 47.0, PRODUCT_TAG));

        let reading = pipeline
            .handle_event(&event_with_payload(payload), t0)
            .await
            .unwrap();
        assert!((reading.temp_primary - 22.5).abs() <= 0.1);
    }
}
