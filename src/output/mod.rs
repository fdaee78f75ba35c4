//! Output formatters for proximity snapshots.
//!
//! This module provides a trait for rendering a published snapshot and
//! implementations for a human-readable listing and InfluxDB line protocol.

pub mod influxdb;
pub mod text;

use crate::location::LocationMap;
use crate::snapshot::Snapshot;

/// Trait for formatting snapshots into output text.
///
/// Implementations decide how the ranked entries and the closest transmitter
/// are laid out. Locations are resolved here, never in the registry.
pub trait SnapshotFormatter: Send + Sync {
    /// Format a snapshot.
    ///
    /// # Arguments
    /// * `snapshot` - The published snapshot to render
    /// * `locations` - Labels for beacon minors
    ///
    /// # Returns
    /// Zero or more lines, without a trailing newline
    fn format(&self, snapshot: &Snapshot, locations: &LocationMap) -> String;
}

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    /// Closest location followed by the ranked list
    #[default]
    Text,
    /// One InfluxDB line-protocol point per ranked beacon
    Influxdb,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Text => write!(f, "text"),
            Format::Influxdb => write!(f, "influxdb"),
        }
    }
}
