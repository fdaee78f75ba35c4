//! Human-readable snapshot listing.

use crate::location::{LocationMap, NO_BEACONS, resolve_label};
use crate::output::SnapshotFormatter;
use crate::snapshot::Snapshot;
use crate::transmitter::TrackedTransmitter;
use std::fmt::Write;

/// Formats a snapshot as a header naming the closest location, followed by
/// one line per beacon in rank order.
///
/// ```text
/// closest: Salon (46) at 0.52 m
///   1. Salon (46)  0.52 m  rssi=-61 tx=-59  f7826da6-4fa2-4e98-8024-bc5b71e0893e:1:46
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }

    fn entry_line(
        out: &mut String,
        rank: usize,
        entry: &TrackedTransmitter,
        locations: &LocationMap,
    ) {
        let _ = write!(
            out,
            "\n  {rank}. {label}  {distance:.2} m  rssi={rssi} tx={tx}  {key}",
            label = resolve_label(entry.key().minor, locations),
            distance = entry.estimated_distance,
            rssi = entry.signal_strength,
            tx = entry.reference_tx_power,
            key = entry.key(),
        );
    }
}

impl SnapshotFormatter for TextFormatter {
    fn format(&self, snapshot: &Snapshot, locations: &LocationMap) -> String {
        let mut out = match snapshot.closest() {
            Some(closest) => format!(
                "closest: {} at {:.2} m",
                resolve_label(closest.key().minor, locations),
                closest.estimated_distance
            ),
            None => format!("closest: {NO_BEACONS}"),
        };

        for (index, entry) in snapshot.ranked().iter().enumerate() {
            Self::entry_line(&mut out, index + 1, entry, locations);
        }
        out
    }
}
