//! Raw proximity readings as delivered by a reading source.
//!
//! A `RawReading` carries identifiers in the loose shape a ranging library
//! hands them out (textual UUID, wide integers). Resolving it checks the key
//! and the distance before anything touches the registry.

use crate::beacon_key::BeaconKey;
use thiserror::Error;
use uuid::Uuid;

/// One observation of a transmitter, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    /// Proximity UUID in textual form
    pub origin_id: String,
    /// Major identifier
    pub group_id: i32,
    /// Minor identifier
    pub sub_id: i32,
    /// Received signal strength in dBm
    pub signal_strength: i16,
    /// Calibrated transmit power at one metre, in dBm
    pub reference_tx_power: i16,
    /// Estimated distance in metres
    pub estimated_distance: f64,
}

/// A batch of readings from one scan cycle, in arrival order.
pub type ReadingBatch = Vec<RawReading>;

/// Why a raw reading was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadingError {
    #[error("origin id '{0}' is not a UUID")]
    InvalidOrigin(String),
    #[error("group id {0} is outside 0..=65535")]
    GroupOutOfRange(i32),
    #[error("sub id {0} is outside 0..=65535")]
    SubOutOfRange(i32),
    #[error("estimated distance {0} is not finite")]
    NonFiniteDistance(f64),
    #[error("estimated distance {0} is negative")]
    NegativeDistance(f64),
}

/// A reading whose key resolved and whose values are usable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidReading {
    pub key: BeaconKey,
    pub signal_strength: i16,
    pub reference_tx_power: i16,
    pub estimated_distance: f64,
}

impl RawReading {
    /// Resolve the composite key of this reading.
    pub fn key(&self) -> Result<BeaconKey, ReadingError> {
        let uuid = Uuid::parse_str(self.origin_id.trim())
            .map_err(|_| ReadingError::InvalidOrigin(self.origin_id.clone()))?;
        let major =
            u16::try_from(self.group_id).map_err(|_| ReadingError::GroupOutOfRange(self.group_id))?;
        let minor =
            u16::try_from(self.sub_id).map_err(|_| ReadingError::SubOutOfRange(self.sub_id))?;
        Ok(BeaconKey::new(uuid, major, minor))
    }

    /// Validate the whole reading.
    ///
    /// # Errors
    /// Returns a `ReadingError` when the key does not resolve or the distance
    /// is non-finite or negative.
    pub fn validate(&self) -> Result<ValidReading, ReadingError> {
        let key = self.key()?;
        let distance = self.estimated_distance;
        if !distance.is_finite() {
            return Err(ReadingError::NonFiniteDistance(distance));
        }
        if distance < 0.0 {
            return Err(ReadingError::NegativeDistance(distance));
        }
        Ok(ValidReading {
            key,
            signal_strength: self.signal_strength,
            reference_tx_power: self.reference_tx_power,
            estimated_distance: distance,
        })
    }
}
