//! Ranking of tracked transmitters by estimated distance.

use crate::transmitter::TrackedTransmitter;
use std::cmp::Ordering;

/// Ordering used for the ranked view: nearest first, ties broken by key.
///
/// `f64::total_cmp` keeps the order total; distances are validated finite and
/// non-negative before they reach the registry.
pub fn by_distance(a: &TrackedTransmitter, b: &TrackedTransmitter) -> Ordering {
    a.estimated_distance
        .total_cmp(&b.estimated_distance)
        .then_with(|| a.key().cmp(b.key()))
}

/// Produce the ranked view of `entries` as independently owned copies.
///
/// The input is never mutated. Identical input sets yield identical output
/// regardless of iteration order.
pub fn rank<'a, I>(entries: I) -> Vec<TrackedTransmitter>
where
    I: IntoIterator<Item = &'a TrackedTransmitter>,
{
    let mut ranked: Vec<TrackedTransmitter> = entries.into_iter().cloned().collect();
    ranked.sort_by(by_distance);
    ranked
}

/// The nearest entry of a ranked view, if any.
pub fn closest(ranked: &[TrackedTransmitter]) -> Option<&TrackedTransmitter> {
    ranked.first()
}
