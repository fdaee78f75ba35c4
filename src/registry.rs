//! Proximity registry: merge, expiry and publication of tracked transmitters.
//!
//! The registry owns a single map from [`BeaconKey`] to [`TrackedTransmitter`]
//! behind one mutex. Every mutation (`update` or `sweep_expired`) runs merge,
//! eviction, ranking and publication as one critical section, so snapshots
//! are published in the same order as the mutations that produced them.
//!
//! Readers never take the lock. They receive `Arc<Snapshot>` values through
//! [`ProximityRegistry::snapshot`] or a [`SnapshotReceiver`].

use crate::beacon_key::BeaconKey;
use crate::clock::Timestamp;
use crate::config::{ConfigError, RegistryConfig};
use crate::reading::RawReading;
use crate::snapshot::{Snapshot, SnapshotPublisher, SnapshotReceiver};
use crate::transmitter::TrackedTransmitter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

type Entries = HashMap<BeaconKey, TrackedTransmitter>;

/// What a single `update` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateSummary {
    /// Readings merged into the registry
    pub applied: usize,
    /// Malformed readings that were skipped
    pub dropped: usize,
    /// Entries evicted as stale after the merge
    pub evicted: usize,
}

/// Keyed store of currently nearby transmitters.
///
/// Cloning is cheap and yields another handle to the same registry.
#[derive(Debug, Clone)]
pub struct ProximityRegistry {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: RegistryConfig,
    entries: Mutex<Entries>,
    publisher: SnapshotPublisher,
}

impl ProximityRegistry {
    /// Create an empty registry.
    ///
    /// # Errors
    /// Returns `ConfigError` if `config` does not validate.
    pub fn new(config: RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                entries: Mutex::new(HashMap::new()),
                publisher: SnapshotPublisher::new(),
            }),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Merge a batch of readings observed at `now`.
    ///
    /// Readings are applied in batch order, so the last reading for a key
    /// wins. Malformed readings are logged and skipped. Stale entries are then
    /// evicted and a new snapshot is published unconditionally.
    pub fn update(&self, batch: &[RawReading], now: Timestamp) -> UpdateSummary {
        let mut entries = self.lock_entries();
        let mut summary = UpdateSummary::default();

        for raw in batch {
            match raw.validate() {
                Ok(reading) => {
                    entries
                        .entry(reading.key)
                        .and_modify(|entry| entry.observe(&reading, now))
                        .or_insert_with(|| TrackedTransmitter::first_seen(&reading, now));
                    summary.applied += 1;
                }
                Err(reason) => {
                    debug!(
                        origin_id = %raw.origin_id,
                        group_id = raw.group_id,
                        sub_id = raw.sub_id,
                        %reason,
                        "dropping malformed reading"
                    );
                    summary.dropped += 1;
                }
            }
        }

        summary.evicted = evict_expired(&mut entries, now, self.inner.config.ttl);
        self.publish_locked(&entries, now);

        trace!(
            applied = summary.applied,
            dropped = summary.dropped,
            evicted = summary.evicted,
            live = entries.len(),
            %now,
            "registry updated"
        );
        summary
    }

    /// Evict every entry older than the TTL at `now`.
    ///
    /// Publishes a new snapshot only when something was evicted. Returns the
    /// number of evicted entries.
    pub fn sweep_expired(&self, now: Timestamp) -> usize {
        let mut entries = self.lock_entries();
        let evicted = evict_expired(&mut entries, now, self.inner.config.ttl);
        if evicted > 0 {
            self.publish_locked(&entries, now);
            debug!(evicted, live = entries.len(), %now, "sweep evicted stale entries");
        }
        evicted
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.publisher.current()
    }

    /// Subscribe to snapshots published from now on.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.inner.publisher.subscribe()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_entries(&self) -> MutexGuard<'_, Entries> {
        // Entries are only mutated through complete merge/evict steps, so a
        // poisoned map is still consistent.
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_locked(&self, entries: &Entries, now: Timestamp) {
        let ranked = crate::ranking::rank(entries.values());
        self.inner.publisher.publish(Snapshot::new(ranked, now));
    }
}

fn evict_expired(entries: &mut Entries, now: Timestamp, ttl: Duration) -> usize {
    let before = entries.len();
    entries.retain(|key, entry| {
        let expired = entry.is_expired(now, ttl);
        if expired {
            debug!(
                %key,
                last_seen_at = %entry.last_seen_at,
                %now,
                "evicting stale transmitter"
            );
        }
        !expired
    });
    before - entries.len()
}
