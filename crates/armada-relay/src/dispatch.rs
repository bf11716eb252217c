//! [`InboundDispatcher`] – classifies inbound radio frames and applies
//! them to the fleet.
//!
//! Per frame: decode the envelope, ensure the vehicle record exists
//! (registration-on-first-contact, uniform across every message type),
//! apply the type-specific registry mutation, and publish a `boat_data`
//! event when the message carries externally relevant state.  Decode
//! failures and unknown discriminators are logged per-message and never
//! stop the loop.

use armada_fleet::FleetRegistry;
use armada_link::RawFrame;
use armada_types::{ArmadaError, ClientEvent, WireMessage};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::calibration::CalibrationCorrelator;

#[derive(Clone)]
pub struct InboundDispatcher {
    registry: FleetRegistry,
    bus: EventBus,
    correlator: CalibrationCorrelator,
}

impl InboundDispatcher {
    pub fn new(
        registry: FleetRegistry,
        bus: EventBus,
        correlator: CalibrationCorrelator,
    ) -> Self {
        Self {
            registry,
            bus,
            correlator,
        }
    }

    /// Consume frames until every producer is gone (process shutdown).
    pub async fn run(self, mut inbound: mpsc::Receiver<RawFrame>) {
        while let Some(frame) = inbound.recv().await {
            if let Err(e) = self.process(&frame) {
                warn!(source = %frame.source, error = %e, "dropping inbound frame");
            }
        }
    }

    /// Apply a single frame.  Errors are per-message: they leave the
    /// registry untouched for every other vehicle and the caller's loop
    /// running.
    pub fn process(&self, frame: &RawFrame) -> Result<(), ArmadaError> {
        let message = WireMessage::decode(&frame.payload)?;
        let id = message.vehicle_id().to_string();
        self.registry.upsert_on_contact(&id, frame.source.clone());

        match &message {
            WireMessage::Register { .. } => {
                debug!(vehicle = %id, "explicit registration");
            }
            WireMessage::Heartbeat {
                status,
                notification,
                ..
            } => {
                self.registry
                    .set_status(&id, status.clone(), notification.clone());
                debug!(vehicle = %id, %status, "heartbeat");
            }
            WireMessage::Position { .. }
            | WireMessage::Environment { .. }
            | WireMessage::Magnetics { .. } => {
                if let Some(patch) = message.telemetry_patch() {
                    self.registry.merge_telemetry(&id, &patch);
                }
                self.publish_boat_data(&id);
            }
            WireMessage::CalibrationData { profile, .. } => {
                self.registry.set_calibration(&id, *profile);
                if !self.correlator.resolve(&id, *profile) {
                    debug!(vehicle = %id, "unsolicited calibration data stored");
                }
                self.publish_boat_data(&id);
            }
            other => {
                // Outbound-only envelopes have no business arriving here.
                warn!(vehicle = %id, envelope = ?other, "ignoring outbound-tagged frame from the radio");
            }
        }
        Ok(())
    }

    fn publish_boat_data(&self, id: &str) {
        if let Some(record) = self.registry.get(id) {
            self.bus.publish(ClientEvent::BoatData {
                id: id.to_string(),
                data: record.telemetry,
                timestamp: Utc::now(),
            });
        }
    }
}
