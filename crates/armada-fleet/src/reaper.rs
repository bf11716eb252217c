//! [`LivenessReaper`] – periodic eviction of silent vehicles.
//!
//! A vehicle is reachable while `now - last_seen` stays within the
//! configured timeout.  The reaper sweeps on its own interval (the two
//! durations are independent configuration) and removal is
//! unconditional: no grace period, no hysteresis.  A vehicle that makes
//! contact again after eviction registers as a brand-new record.

use std::time::Duration;

use tracing::info;

use crate::registry::FleetRegistry;

pub struct LivenessReaper {
    registry: FleetRegistry,
    timeout: Duration,
    interval: Duration,
}

impl LivenessReaper {
    pub fn new(registry: FleetRegistry, timeout: Duration, interval: Duration) -> Self {
        Self {
            registry,
            timeout,
            interval,
        }
    }

    /// Run one sweep and return the identifiers that were evicted.
    pub fn sweep(&self) -> Vec<String> {
        let removed = self.registry.reap(self.timeout);
        for id in &removed {
            info!(vehicle = %id, "removing inactive vehicle");
        }
        removed
    }

    /// Sweep forever on the configured interval.  Never returns during
    /// normal operation.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.sweep();
        }
    }
}
