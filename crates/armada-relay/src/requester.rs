//! [`DataRequester`] – periodic telemetry poll.
//!
//! Vehicles answer a `dr` envelope with their `dt*` frames.  The
//! requester polls every vehicle currently in the registry on a fixed
//! interval; the liveness reaper keeps that set fresh, so silent
//! vehicles age out of the poll on their own.

use std::time::Duration;

use armada_fleet::FleetRegistry;
use armada_link::OutboundCommand;
use armada_types::WireMessage;
use tokio::sync::mpsc;
use tracing::warn;

pub struct DataRequester {
    registry: FleetRegistry,
    outbound: mpsc::Sender<OutboundCommand>,
    interval: Duration,
}

impl DataRequester {
    pub fn new(
        registry: FleetRegistry,
        outbound: mpsc::Sender<OutboundCommand>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            outbound,
            interval,
        }
    }

    /// Queue one data request per known vehicle.  Returns how many were
    /// queued.
    pub fn poll_once(&self) -> usize {
        let snapshot = self.registry.snapshot();
        let mut queued = 0;
        for (id, _) in &snapshot {
            let message = WireMessage::DataRequest { id: id.clone() };
            match self.outbound.try_send(OutboundCommand {
                vehicle_id: id.clone(),
                payload: message.encode(),
            }) {
                Ok(()) => queued += 1,
                Err(e) => warn!(vehicle = %id, error = %e, "could not queue data request"),
            }
        }
        queued
    }

    /// Poll forever on the configured interval.  Never returns during
    /// normal operation.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.poll_once();
        }
    }
}
