//! Composite identity of a physical iBeacon transmitter.
//!
//! A transmitter is named by its proximity UUID (origin), major (group) and
//! minor (sub) identifiers. The key is a plain value: equality and hashing are
//! structural, and the derived ordering is used to break distance ties.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Key uniquely identifying a tracked transmitter.
///
/// Field order matters: the derived `Ord` compares `uuid`, then `major`, then
/// `minor`, which gives rankings a deterministic tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BeaconKey {
    /// Proximity UUID shared by a fleet of beacons (origin identifier)
    pub uuid: Uuid,
    /// Group identifier within the UUID
    pub major: u16,
    /// Sub identifier within the group, also used for location lookup
    pub minor: u16,
}

impl BeaconKey {
    pub const fn new(uuid: Uuid, major: u16, minor: u16) -> Self {
        Self { uuid, major, minor }
    }
}

impl fmt::Display for BeaconKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.uuid.hyphenated(), self.major, self.minor)
    }
}

/// Errors returned when parsing a `uuid:major:minor` key string.
#[derive(Error, Debug, PartialEq)]
pub enum ParseKeyError {
    #[error("invalid beacon key: expected UUID:MAJOR:MINOR, got {0} parts")]
    InvalidLength(usize),
    #[error("invalid beacon key: '{0}' is not a UUID")]
    InvalidUuid(String),
    #[error("invalid beacon key: '{0}' is not a 16-bit identifier")]
    InvalidIdentifier(String),
}

impl FromStr for BeaconKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [uuid, major, minor] = parts.as_slice() else {
            return Err(ParseKeyError::InvalidLength(parts.len()));
        };

        let uuid =
            Uuid::parse_str(uuid).map_err(|_| ParseKeyError::InvalidUuid(uuid.to_string()))?;
        let parse_id = |part: &str| {
            part.parse::<u16>()
                .map_err(|_| ParseKeyError::InvalidIdentifier(part.to_string()))
        };

        Ok(BeaconKey::new(uuid, parse_id(*major)?, parse_id(*minor)?))
    }
}
