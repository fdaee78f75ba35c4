//! BlueZ D-Bus backend for iBeacon ranging.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.

use super::{APPLE_MANUFACTURER_ID, BATCH_CHANNEL_BUFFER_SIZE, ScanError, decode_ibeacon};
use crate::reading::{RawReading, ReadingBatch};
use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, Session};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Start ranging iBeacons using the BlueZ D-Bus backend.
///
/// Discovery runs with duplicate reporting enabled, so every advertisement
/// refreshes the device's RSSI. Readings are collected per device and
/// delivered as one batch per `scan_period`.
///
/// # Returns
/// A receiver of reading batches. The scan stops when it is dropped.
pub async fn start_scan(
    scan_period: Duration,
) -> Result<mpsc::Receiver<ReadingBatch>, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;
    adapter
        .set_discovery_filter(DiscoveryFilter {
            transport: DiscoveryTransport::Le,
            duplicate_data: true,
            ..Default::default()
        })
        .await?;

    let events = Box::pin(adapter.discover_devices_with_changes().await?);
    let (tx, rx) = mpsc::channel(BATCH_CHANNEL_BUFFER_SIZE);

    info!(adapter = adapter.name(), ?scan_period, "iBeacon scan started");

    // Spawn a task that owns all Bluetooth state and runs the event loop
    tokio::spawn(async move {
        // Keep the D-Bus session alive by moving it into this task
        let _session = session;
        let mut events = events;
        let mut pending: HashMap<Address, RawReading> = HashMap::new();
        let mut ticker = tokio::time::interval(scan_period);
        ticker.tick().await;

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(AdapterEvent::DeviceAdded(address)) => {
                        match read_device(&adapter, address).await {
                            Ok(Some(reading)) => {
                                pending.insert(address, reading);
                            }
                            Ok(None) => {}
                            Err(error) => debug!(%address, %error, "skipping advertisement"),
                        }
                    }
                    Some(_) => {}
                    None => break,
                },
                _ = ticker.tick() => {
                    let batch: ReadingBatch = pending.drain().map(|(_, reading)| reading).collect();
                    if tx.send(batch).await.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("iBeacon scan stopped");
    });

    Ok(rx)
}

/// Read the latest iBeacon frame and RSSI of a discovered device.
///
/// Returns `Ok(None)` for devices that are not advertising Apple
/// manufacturer data or have no RSSI yet.
async fn read_device(
    adapter: &Adapter,
    address: Address,
) -> Result<Option<RawReading>, ScanError> {
    let device = adapter.device(address)?;

    let Some(manufacturer_data) = device.manufacturer_data().await? else {
        return Ok(None);
    };
    let Some(frame) = manufacturer_data.get(&APPLE_MANUFACTURER_ID) else {
        return Ok(None);
    };
    let Some(rssi) = device.rssi().await? else {
        return Ok(None);
    };

    Ok(Some(decode_ibeacon(frame, rssi)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bluer_error_maps_to_bluetooth_scan_error() {
        let err: ScanError = bluer::Error {
            kind: bluer::ErrorKind::NotReady,
            message: "adapter not ready".to_string(),
        }
        .into();
        assert!(matches!(err, ScanError::Bluetooth(_)));
        assert!(err.to_string().starts_with("Bluetooth error:"));
    }
}
