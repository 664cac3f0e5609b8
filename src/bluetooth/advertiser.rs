/// Bluetooth Low Energy broadcast advertising
use bluer::adv::{Advertisement, AdvertisementHandle, Type};
use bluer::Adapter;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::codec::COMPANY_ID;

// The controller advertises continuously between payload updates; 200 ms
// keeps a passive scanner likely to catch each cycle's record.
const ADVERTISING_INTERVAL: Duration = Duration::from_millis(200);

/// Broadcast beacon carrying the telemetry payload as manufacturer data
///
/// The controller caches advertisement contents, so updating the payload
/// requires unregistering the previous advertisement and registering a new
/// one. `publish` performs that stop/start cycle on every call.
pub struct Beacon {
    adapter: Adapter,
    local_name: String,
    handle: Option<AdvertisementHandle>,
}

impl Beacon {
    pub async fn new(adapter: Adapter) -> bluer::Result<Self> {
        let address = adapter.address().await?;
        // Name the node after the tail of its hardware address so it can
        // be told apart during commissioning.
        let local_name = format!("WB{:02X}{:02X}", address.0[4], address.0[5]);

        Ok(Beacon {
            adapter,
            local_name,
            handle: None,
        })
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Replace the on-air payload and (re)assert broadcasting
    pub async fn publish(&mut self, payload: Vec<u8>) -> bluer::Result<()> {
        // Dropping the handle unregisters the stale advertisement.
        self.handle = None;

        let advertisement = Advertisement {
            advertisement_type: Type::Broadcast,
            manufacturer_data: BTreeMap::from([(COMPANY_ID, payload)]),
            discoverable: Some(true),
            local_name: Some(self.local_name.clone()),
            min_interval: Some(ADVERTISING_INTERVAL),
            max_interval: Some(ADVERTISING_INTERVAL),
            ..Default::default()
        };

        self.handle = Some(self.adapter.advertise(advertisement).await?);
        Ok(())
    }

    /// Stop broadcasting
    pub fn stop(&mut self) {
        self.handle = None;
    }
}
