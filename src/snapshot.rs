//! Immutable ranked views handed to consumers.
//!
//! Every publication is a fresh `Arc<Snapshot>` holding its own copies of the
//! tracked transmitters. Consumers can keep, clone or dissect a snapshot
//! without ever reaching the registry's internal entries.

use crate::clock::Timestamp;
use crate::transmitter::TrackedTransmitter;
use std::sync::Arc;
use tokio::sync::watch;

/// A frozen ranked view of the registry at one point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    ranked: Vec<TrackedTransmitter>,
    as_of: Timestamp,
}

impl Snapshot {
    /// Build a snapshot from an already ranked sequence of owned entries.
    pub fn new(ranked: Vec<TrackedTransmitter>, as_of: Timestamp) -> Self {
        Self { ranked, as_of }
    }

    /// Entries nearest first.
    pub fn ranked(&self) -> &[TrackedTransmitter] {
        &self.ranked
    }

    /// The nearest entry, or `None` when nothing is in range.
    pub fn closest(&self) -> Option<&TrackedTransmitter> {
        crate::ranking::closest(&self.ranked)
    }

    /// The `now` of the mutation that produced this snapshot.
    pub fn as_of(&self) -> Timestamp {
        self.as_of
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Take ownership of the ranked entries.
    pub fn into_ranked(self) -> Vec<TrackedTransmitter> {
        self.ranked
    }
}

/// Receiving side of snapshot publication.
pub type SnapshotReceiver = watch::Receiver<Arc<Snapshot>>;

/// Latest-value publication of snapshots.
///
/// Publishing replaces the stored value and wakes receivers without waiting
/// for them; a slow consumer only ever misses intermediate snapshots.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotPublisher {
    /// Create a publisher whose current value is the empty snapshot.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::default()));
        Self { tx }
    }

    /// Publish `snapshot`, superseding the previous one.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    /// The most recently published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.tx.borrow())
    }

    /// Subscribe to future publications. The current value counts as seen.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.tx.subscribe()
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}
