//! Tracked transmitter entity.

use crate::beacon_key::BeaconKey;
use crate::clock::Timestamp;
use crate::reading::ValidReading;

/// The registry's record of one transmitter.
///
/// The key is fixed at creation. Every other field holds the last observed
/// value and is overwritten on each reading for the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTransmitter {
    key: BeaconKey,
    /// Received signal strength in dBm
    pub signal_strength: i16,
    /// Calibrated transmit power at one metre, in dBm
    pub reference_tx_power: i16,
    /// Estimated distance in metres
    pub estimated_distance: f64,
    /// When this key was last observed
    pub last_seen_at: Timestamp,
}

impl TrackedTransmitter {
    /// Create an entry from the first reading of an unseen key.
    pub fn first_seen(reading: &ValidReading, now: Timestamp) -> Self {
        Self {
            key: reading.key,
            signal_strength: reading.signal_strength,
            reference_tx_power: reading.reference_tx_power,
            estimated_distance: reading.estimated_distance,
            last_seen_at: now,
        }
    }

    pub fn key(&self) -> &BeaconKey {
        &self.key
    }

    /// Overwrite the mutable fields with a newer reading for the same key.
    pub fn observe(&mut self, reading: &ValidReading, now: Timestamp) {
        debug_assert_eq!(self.key, reading.key);
        self.signal_strength = reading.signal_strength;
        self.reference_tx_power = reading.reference_tx_power;
        self.estimated_distance = reading.estimated_distance;
        self.last_seen_at = now;
    }

    /// True once more than `ttl` has passed since the last observation.
    pub fn is_expired(&self, now: Timestamp, ttl: std::time::Duration) -> bool {
        now.saturating_since(self.last_seen_at) > ttl
    }
}
