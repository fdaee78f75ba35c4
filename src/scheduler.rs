//! Periodic expiry sweeps.
//!
//! The scheduler drives [`ProximityRegistry::sweep_expired`] on a fixed
//! cadence, independent of reading arrival, so entries disappear even when the
//! reading source goes quiet. It runs as a tokio task between `start` and
//! `stop`; both calls are idempotent.
//!
//! # Example
//!
//! ```ignore
//! let scheduler = ExpiryScheduler::new(registry.clone(), clock.clone());
//! scheduler.start();
//! // ... consumer is active ...
//! scheduler.stop();
//! ```

use crate::clock::Clock;
use crate::registry::ProximityRegistry;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Background sweeper for a proximity registry.
pub struct ExpiryScheduler {
    registry: ProximityRegistry,
    clock: Arc<dyn Clock>,
    period: Duration,
    running: Mutex<Option<CancellationToken>>,
}

impl ExpiryScheduler {
    /// Create a stopped scheduler sweeping every `registry.config().sweep_period`.
    pub fn new(registry: ProximityRegistry, clock: Arc<dyn Clock>) -> Self {
        let period = registry.config().sweep_period;
        Self {
            registry,
            clock,
            period,
            running: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Start sweeping. Must be called from within a tokio runtime.
    ///
    /// Returns `false` without doing anything if already running.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            debug!("expiry scheduler already running");
            return false;
        }

        let token = CancellationToken::new();
        tokio::spawn(sweep_loop(
            self.registry.clone(),
            Arc::clone(&self.clock),
            self.period,
            token.clone(),
        ));
        *running = Some(token);

        info!(
            period_ms = u64::try_from(self.period.as_millis()).unwrap_or(u64::MAX),
            "expiry scheduler started"
        );
        true
    }

    /// Stop scheduling further sweeps.
    ///
    /// A sweep already in progress completes. Returns `false` if the scheduler
    /// was not running.
    pub fn stop(&self) -> bool {
        let token = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match token {
            Some(token) => {
                token.cancel();
                info!("expiry scheduler stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweep_loop(
    registry: ProximityRegistry,
    clock: Arc<dyn Clock>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the first immediate tick
    interval.tick().await;

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            _ = interval.tick() => {
                let evicted = registry.sweep_expired(clock.now());
                debug!(evicted, "periodic sweep");
            }
        }
    }
}
