//! `beacon-proximity` library.
//!
//! Tracks nearby iBeacon transmitters in a [`ProximityRegistry`], forgets
//! the ones that go quiet, and publishes distance-ranked [`Snapshot`]s.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing and process exit codes.
//! The run loop lives in [`crate::app`] where it can be tested
//! deterministically with an injected reading source and output stream.

pub mod app;
pub mod beacon_key;
pub mod clock;
pub mod config;
pub mod location;
pub mod logging;
pub mod output;
pub mod ranking;
pub mod reading;
pub mod registry;
pub mod scanner;
pub mod scheduler;
pub mod snapshot;
pub mod transmitter;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use beacon_key::BeaconKey;
pub use clock::{Clock, MonotonicClock, Timestamp};
pub use config::{ConfigError, RegistryConfig, parse_duration};
pub use location::{Location, LocationMap, parse_location};
pub use output::SnapshotFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use output::text::TextFormatter;
pub use reading::{RawReading, ReadingBatch, ReadingError, ValidReading};
pub use registry::{ProximityRegistry, UpdateSummary};
pub use scanner::{DecodeError, ScanError, decode_ibeacon, estimate_distance};
pub use scheduler::ExpiryScheduler;
pub use snapshot::{Snapshot, SnapshotPublisher, SnapshotReceiver};
pub use transmitter::TrackedTransmitter;
