use bluer::Address;
use std::collections::HashMap;
use std::sync::Mutex;
use time::{Duration, OffsetDateTime};

/// Per-device admission gate in front of persistence
///
/// Tracks the time of the last admitted reading for every device identity
/// and admits a new reading only once the configured interval has elapsed.
/// The check and the update happen under a single lock acquisition, so two
/// near-simultaneous observations of the same identity cannot both pass.
///
/// Entries are never removed; the map is bounded in practice by the number
/// of distinct hardware identities ever observed.
#[derive(Debug)]
pub struct AdmissionThrottle {
    interval: Duration,
    last_admitted: Mutex<HashMap<Address, OffsetDateTime>>,
}

impl AdmissionThrottle {
    pub fn new(interval: Duration) -> Self {
        AdmissionThrottle {
            interval,
            last_admitted: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically decide whether a reading for `identity` may be persisted
    ///
    /// Admits when the identity has never been seen or when `now - last`
    /// has reached the interval, and records `now` as the new last-admitted
    /// time. Rejects otherwise, leaving the stored time untouched.
    pub fn try_admit(&self, identity: Address, now: OffsetDateTime) -> bool {
        let mut last_admitted = self.last_admitted.lock().unwrap();

        if let Some(last) = last_admitted.get(&identity) {
            if now - *last < self.interval {
                return false;
            }
        }

        last_admitted.insert(identity, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sensor_a() -> Address {
        Address::new([0xE1, 0xBD, 0xF2, 0xF7, 0x60, 0x45])
    }

    fn sensor_b() -> Address {
        Address::new([0xC3, 0x1A, 0x08, 0x56, 0x82, 0x67])
    }

    #[test]
    fn test_first_observation_is_admitted() {
        let throttle = AdmissionThrottle::new(Duration::seconds(60));
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        assert!(throttle.try_admit(sensor_a(), t0));
    }

    #[test]
    fn test_observation_within_window_is_rejected() {
        let throttle = AdmissionThrottle::new(Duration::seconds(60));
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        assert!(throttle.try_admit(sensor_a(), t0));
        assert!(!throttle.try_admit(sensor_a(), t0 + Duration::seconds(59)));
    }

    #[test]
    fn test_observation_after_window_is_admitted_and_resets_clock() {
        let throttle = AdmissionThrottle::new(Duration::seconds(60));
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        assert!(throttle.try_admit(sensor_a(), t0));
        assert!(!throttle.try_admit(sensor_a(), t0 + Duration::seconds(59)));
        assert!(throttle.try_admit(sensor_a(), t0 + Duration::seconds(61)));

        // The clock restarted at t0 + 61s, so t0 + 100s is still inside
        // the new window.
        assert!(!throttle.try_admit(sensor_a(), t0 + Duration::seconds(100)));
        assert!(throttle.try_admit(sensor_a(), t0 + Duration::seconds(121)));
    }

    #[test]
    fn test_elapsed_exactly_interval_is_admitted() {
        let throttle = AdmissionThrottle::new(Duration::seconds(60));
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        assert!(throttle.try_admit(sensor_a(), t0));
        assert!(throttle.try_admit(sensor_a(), t0 + Duration::seconds(60)));
    }

    #[test]
    fn test_rejection_does_not_touch_the_stored_time() {
        let throttle = AdmissionThrottle::new(Duration::seconds(60));
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        assert!(throttle.try_admit(sensor_a(), t0));
        assert!(!throttle.try_admit(sensor_a(), t0 + Duration::seconds(30)));

        // Had the rejection at +30s refreshed the entry, +60s would still
        // be inside the window.
        assert!(throttle.try_admit(sensor_a(), t0 + Duration::seconds(60)));
    }

    #[test]
    fn test_distinct_identities_are_independent() {
        let throttle = AdmissionThrottle::new(Duration::seconds(60));
        let t0 = datetime!(2026-08-06 12:00:00 UTC);

        assert!(throttle.try_admit(sensor_a(), t0));
        assert!(throttle.try_admit(sensor_b(), t0));
        assert!(!throttle.try_admit(sensor_a(), t0 + Duration::seconds(10)));
        assert!(!throttle.try_admit(sensor_b(), t0 + Duration::seconds(10)));
    }
}
