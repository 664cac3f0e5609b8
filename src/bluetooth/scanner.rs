/// Bluetooth Low Energy advertisement observation
use bluer::{Adapter, AdapterEvent, Address, Device, DeviceEvent, DeviceProperty};
use futures_util::{pin_mut, StreamExt};
use log::{debug, warn};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::AdvertisementEvent;

/// Observe advertisements and feed them into the ingestion channel
///
/// Runs device discovery on the adapter and spawns a watcher task per
/// discovered device. Watchers forward the device's current manufacturer
/// data and every subsequent manufacturer-data change, together with the
/// most recent signal strength. All events for all devices funnel into the
/// single `tx` channel, whose consumer serializes admission decisions.
///
/// The discovery stream is open-ended; this function returns only when the
/// stream or the consumer goes away.
pub async fn run_scanner(
    adapter: Adapter,
    tx: mpsc::Sender<AdvertisementEvent>,
) -> bluer::Result<()> {
    // Report duplicate advertisements: the admission throttle needs to see
    // repeated broadcasts from the same node.
    let filter = bluer::DiscoveryFilter {
        transport: bluer::DiscoveryTransport::Le,
        duplicate_data: true,
        ..Default::default()
    };

    if let Err(e) = adapter.set_discovery_filter(filter).await {
        warn!("Failed to set discovery filter: {}", e);
    }

    let discovery = adapter.discover_devices().await?;
    pin_mut!(discovery);

    let mut watchers: HashMap<Address, JoinHandle<()>> = HashMap::new();

    while let Some(event) = discovery.next().await {
        match event {
            AdapterEvent::DeviceAdded(addr) => {
                let device = match adapter.device(addr) {
                    Ok(device) => device,
                    Err(e) => {
                        debug!("Failed to open device {}: {}", addr, e);
                        continue;
                    }
                };

                if let Some(previous) = watchers.insert(addr, tokio::spawn(watch_device(device, tx.clone()))) {
                    previous.abort();
                }
            }
            AdapterEvent::DeviceRemoved(addr) => {
                if let Some(watcher) = watchers.remove(&addr) {
                    watcher.abort();
                }
            }
            _ => {}
        }

        if tx.is_closed() {
            break;
        }
    }

    for watcher in watchers.into_values() {
        watcher.abort();
    }

    Ok(())
}

/// Forward one device's advertisement data into the channel
///
/// Sends a snapshot of the manufacturer data known at discovery time, then
/// one event per manufacturer-data property change. RSSI changes are
/// tracked and attached to the next event; they do not produce events of
/// their own.
async fn watch_device(device: Device, tx: mpsc::Sender<AdvertisementEvent>) {
    let identity = device.address();

    let mut rssi = match device.rssi().await {
        Ok(Some(rssi)) => rssi,
        _ => 0,
    };

    if let Ok(Some(manufacturer_data)) = device.manufacturer_data().await {
        let event = AdvertisementEvent {
            identity,
            manufacturer_data,
            rssi,
        };
        if tx.send(event).await.is_err() {
            return;
        }
    }

    let events = match device.events().await {
        Ok(events) => events,
        Err(e) => {
            debug!("Failed to subscribe to events for {}: {}", identity, e);
            return;
        }
    };
    pin_mut!(events);

    while let Some(DeviceEvent::PropertyChanged(property)) = events.next().await {
        match property {
            DeviceProperty::Rssi(value) => rssi = value,
            DeviceProperty::ManufacturerData(manufacturer_data) => {
                let event = AdvertisementEvent {
                    identity,
                    manufacturer_data,
                    rssi,
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            _ => {}
        }
    }
}
