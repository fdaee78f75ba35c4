//! iBeacon reading source.
//!
//! This module decodes iBeacon advertisements into [`RawReading`]s, estimates
//! distance from signal strength, and starts the compiled-in Bluetooth
//! backend, which delivers one [`ReadingBatch`] per scan period.

#[cfg(feature = "bluer")]
pub mod bluer;

use crate::reading::{RawReading, ReadingBatch};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Error types for decoding iBeacon advertisements.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Manufacturer data that is not an iBeacon frame
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// iBeacon frame with the wrong length
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Error type for scanner operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// Data decoding error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    /// Backend not available (not compiled in)
    #[error("Backend '{0}' not available (not compiled in)")]
    BackendNotAvailable(String),
}

/// Apple manufacturer ID, under which iBeacon frames are advertised.
pub const APPLE_MANUFACTURER_ID: u16 = 0x004C;

/// iBeacon frame prefix: type 0x02, length 0x15.
pub const IBEACON_PREFIX: [u8; 2] = [0x02, 0x15];

/// Length of an iBeacon frame after the manufacturer ID.
pub const IBEACON_FRAME_LEN: usize = 23;

/// Channel buffer size for reading batches.
pub const BATCH_CHANNEL_BUFFER_SIZE: usize = 16;

/// Default interval between batches delivered by a scanner.
pub const DEFAULT_SCAN_PERIOD: Duration = Duration::from_millis(1100);

/// Estimate distance in metres from received and reference signal strength.
///
/// Uses the curve-fitted path-loss model common to iBeacon ranging
/// libraries. An RSSI or reference power of zero means "unknown" and yields
/// `-1.0`, which the registry rejects.
pub fn estimate_distance(rssi: i16, tx_power: i16) -> f64 {
    if rssi == 0 || tx_power == 0 {
        return -1.0;
    }

    let ratio = f64::from(rssi) / f64::from(tx_power);
    if ratio < 1.0 {
        ratio.powi(10)
    } else {
        0.89976 * ratio.powf(7.7095) + 0.111
    }
}

/// Decode Apple manufacturer data into a raw reading.
///
/// # Arguments
/// * `data` - The manufacturer-specific data bytes (without the company ID prefix)
/// * `rssi` - Signal strength the advertisement was received with
///
/// # Layout
/// `02 15 | uuid (16) | major (2, BE) | minor (2, BE) | measured power (1, signed)`
pub fn decode_ibeacon(data: &[u8], rssi: i16) -> Result<RawReading, DecodeError> {
    if !data.starts_with(&IBEACON_PREFIX) {
        return Err(DecodeError::UnsupportedFormat(format!(
            "Apple frame type {:02X?} (only iBeacon supported)",
            data.get(..2).unwrap_or(data)
        )));
    }
    if data.len() != IBEACON_FRAME_LEN {
        return Err(DecodeError::InvalidData(format!(
            "iBeacon frame is {} bytes, expected {}",
            data.len(),
            IBEACON_FRAME_LEN
        )));
    }

    let mut uuid = [0u8; 16];
    uuid.copy_from_slice(&data[2..18]);
    let major = u16::from_be_bytes([data[18], data[19]]);
    let minor = u16::from_be_bytes([data[20], data[21]]);
    let tx_power = i16::from(i8::from_be_bytes([data[22]]));

    Ok(RawReading {
        origin_id: Uuid::from_bytes(uuid).to_string(),
        group_id: i32::from(major),
        sub_id: i32::from(minor),
        signal_strength: rssi,
        reference_tx_power: tx_power,
        estimated_distance: estimate_distance(rssi, tx_power),
    })
}

/// Start scanning for iBeacons with the compiled-in backend.
///
/// # Arguments
/// * `scan_period` - How often accumulated readings are delivered as a batch
///
/// # Returns
/// A receiver of reading batches. A batch is sent every period, even when
/// empty, until the receiver is dropped.
pub async fn start_scan(
    scan_period: Duration,
) -> Result<mpsc::Receiver<ReadingBatch>, ScanError> {
    #[cfg(feature = "bluer")]
    return bluer::start_scan(scan_period).await;

    #[cfg(not(feature = "bluer"))]
    {
        let _ = scan_period;
        Err(ScanError::BackendNotAvailable("bluer".to_string()))
    }
}
