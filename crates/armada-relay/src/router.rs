//! [`CommandRouter`] – turns client requests into radio envelopes.
//!
//! Validation happens here; the built payload goes onto the outbound
//! queue and the bridge's writer loop resolves unicast vs broadcast at
//! send time.  Nothing on a client request path ever waits for radio
//! I/O, with one deliberate exception: the calibration round trip, which
//! is always bounded by a timeout.

use std::time::Duration;

use armada_fleet::FleetRegistry;
use armada_link::OutboundCommand;
use armada_types::{
    ArmadaError, CalChannel, CalibrationProfile, ClientEvent, CommandMode, WireMessage,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::calibration::CalibrationCorrelator;

#[derive(Clone)]
pub struct CommandRouter {
    registry: FleetRegistry,
    outbound: mpsc::Sender<OutboundCommand>,
    bus: EventBus,
    correlator: CalibrationCorrelator,
    calibration_timeout: Duration,
}

impl CommandRouter {
    pub fn new(
        registry: FleetRegistry,
        outbound: mpsc::Sender<OutboundCommand>,
        bus: EventBus,
        correlator: CalibrationCorrelator,
        calibration_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            outbound,
            bus,
            correlator,
            calibration_timeout,
        }
    }

    /// `gui_data`: operator command for one vehicle.
    ///
    /// Manual mode carries rudder/sail/throttle set-points, auto mode a
    /// target coordinate pair; anything else is logged and dropped.
    /// Missing set-point fields default to zero.
    pub fn handle_gui_data(&self, data: &Value) {
        let Some(id) = data.get("id").and_then(Value::as_str) else {
            warn!("gui_data without a vehicle id, dropping");
            return;
        };
        let mode_tag = data.get("md").and_then(Value::as_str).unwrap_or("");
        let mode = match mode_tag {
            "mnl" => CommandMode::Manual {
                rudder: num_or_zero(data, "r"),
                sail: num_or_zero(data, "s"),
                throttle: num_or_zero(data, "th"),
            },
            "auto" => CommandMode::Auto {
                target_lat: num_or_zero(data, "tlat"),
                target_lng: num_or_zero(data, "tlng"),
            },
            other => {
                warn!(vehicle = %id, mode = %other, "invalid command mode, dropping");
                return;
            }
        };
        self.enqueue(
            id,
            WireMessage::Command {
                id: id.to_string(),
                mode,
            },
        );
    }

    /// `calibration_data`: store the submitted profile and forward it to
    /// the vehicle as a `cal` envelope (limits rounded to one decimal on
    /// the wire).
    pub fn handle_calibration_data(&self, data: &Value) {
        let Some(id) = data.get("id").and_then(Value::as_str) else {
            warn!("calibration submission without a vehicle id, dropping");
            return;
        };
        let Some(profile) = profile_from_gui(data) else {
            warn!(vehicle = %id, "calibration submission missing limits, dropping");
            return;
        };
        self.registry.set_calibration(id, profile);
        self.enqueue(
            id,
            WireMessage::Calibrate {
                id: id.to_string(),
                profile,
            },
        );
    }

    /// `test_calibration`: single-channel probe sent straight through.
    pub fn handle_test_calibration(&self, data: &Value) {
        let Some(id) = data.get("id").and_then(Value::as_str) else {
            warn!("test_calibration without a vehicle id, dropping");
            return;
        };
        let channel_tag = data.get("type").and_then(Value::as_str).unwrap_or("");
        let Some(channel) = CalChannel::from_tag(channel_tag) else {
            warn!(vehicle = %id, channel = %channel_tag, "invalid calibration channel, dropping");
            return;
        };
        let Some(value) = data.get("value").and_then(Value::as_f64) else {
            warn!(vehicle = %id, "test_calibration without a value, dropping");
            return;
        };
        self.enqueue(
            id,
            WireMessage::CalibrationTest {
                id: id.to_string(),
                channel,
                value,
            },
        );
    }

    /// `request_calibration_data`: correlated round trip with a bounded
    /// wait.
    ///
    /// Publishes exactly one `calibration_data_response` per request:
    /// the vehicle's profile, or an explicit error once the timeout
    /// expires.  The waiter is registered *before* the request envelope
    /// is queued so a fast response cannot race it.
    pub async fn handle_calibration_request(&self, data: &Value) {
        let Some(id) = data.get("id").and_then(Value::as_str) else {
            warn!("calibration request without a vehicle id, dropping");
            return;
        };

        let (token, rx) = self.correlator.register(id);
        self.enqueue(id, WireMessage::CalibrationRequest { id: id.to_string() });

        match tokio::time::timeout(self.calibration_timeout, rx).await {
            Ok(Ok(profile)) => {
                debug!(vehicle = %id, "calibration data received");
                self.bus.publish(ClientEvent::CalibrationDataResponse {
                    id: id.to_string(),
                    data: Some(profile),
                    error: None,
                });
            }
            _ => {
                self.correlator.forget(id, token);
                let err = ArmadaError::CalibrationTimeout { id: id.to_string() };
                warn!(vehicle = %id, "calibration request timed out");
                self.bus.publish(ClientEvent::CalibrationDataResponse {
                    id: id.to_string(),
                    data: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    fn enqueue(&self, id: &str, message: WireMessage) {
        let command = OutboundCommand {
            vehicle_id: id.to_string(),
            payload: message.encode(),
        };
        match self.outbound.try_send(command) {
            Ok(()) => debug!(vehicle = %id, "command queued"),
            Err(TrySendError::Full(_)) => {
                // Documented drop-newest policy under backpressure.
                warn!(vehicle = %id, "outbound queue full, dropping newest command");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(vehicle = %id, "outbound queue closed, dropping command");
            }
        }
    }
}

fn num_or_zero(data: &Value, key: &str) -> f64 {
    data.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn profile_from_gui(data: &Value) -> Option<CalibrationProfile> {
    Some(CalibrationProfile {
        rudder_min: data.get("rudderMin")?.as_f64()?,
        rudder_max: data.get("rudderMax")?.as_f64()?,
        sail_min: data.get("sailMin")?.as_f64()?,
        sail_max: data.get("sailMax")?.as_f64()?,
        throttle_min: data.get("throttleMin")?.as_f64()?,
        throttle_max: data.get("throttleMax")?.as_f64()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;

    fn make_router(
        capacity: usize,
        timeout: Duration,
    ) -> (
        CommandRouter,
        mpsc::Receiver<OutboundCommand>,
        FleetRegistry,
        EventBus,
        CalibrationCorrelator,
    ) {
        let registry = FleetRegistry::new();
        let bus = EventBus::default();
        let correlator = CalibrationCorrelator::new();
        let (tx, rx) = mpsc::channel(capacity);
        let router = CommandRouter::new(
            registry.clone(),
            tx,
            bus.clone(),
            correlator.clone(),
            timeout,
        );
        (router, rx, registry, bus, correlator)
    }

    fn decode(command: &OutboundCommand) -> Value {
        serde_json::from_slice(&command.payload).unwrap()
    }

    #[tokio::test]
    async fn auto_command_for_an_unseen_vehicle_is_queued_not_dropped() {
        let (router, mut rx, registry, _, _) = make_router(8, Duration::from_secs(5));
        assert!(registry.get("B2").is_none());

        router.handle_gui_data(&json!({
            "id": "B2", "md": "auto", "tlat": 10.0, "tlng": 20.0
        }));

        let command = rx.try_recv().expect("command must be queued");
        // Tagged by identifier; with no known address the bridge will
        // broadcast it at send time.
        assert_eq!(command.vehicle_id, "B2");
        let payload = decode(&command);
        assert_eq!(payload["t"], "cmd");
        assert_eq!(payload["md"], "auto");
        assert_eq!(payload["tlat"], 10.0);
        assert_eq!(payload["tlng"], 20.0);
    }

    #[tokio::test]
    async fn manual_command_carries_the_set_points() {
        let (router, mut rx, _, _, _) = make_router(8, Duration::from_secs(5));

        router.handle_gui_data(&json!({
            "id": "B1", "md": "mnl", "r": 12.0, "s": 45.0, "th": 0.6
        }));

        let payload = decode(&rx.try_recv().unwrap());
        assert_eq!(payload["md"], "mnl");
        assert_eq!(payload["r"], 12.0);
        assert_eq!(payload["s"], 45.0);
        assert_eq!(payload["th"], 0.6);
    }

    #[tokio::test]
    async fn invalid_mode_is_silently_dropped() {
        let (router, mut rx, _, _, _) = make_router(8, Duration::from_secs(5));
        router.handle_gui_data(&json!({"id": "B1", "md": "teleport"}));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_vehicle_id_is_silently_dropped() {
        let (router, mut rx, _, _, _) = make_router(8, Duration::from_secs(5));
        router.handle_gui_data(&json!({"md": "auto", "tlat": 1.0}));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn calibration_submission_is_stored_and_forwarded_rounded() {
        let (router, mut rx, registry, _, _) = make_router(8, Duration::from_secs(5));
        registry.upsert_on_contact("B1", armada_link::LinkAddress::new("aa"));

        router.handle_calibration_data(&json!({
            "id": "B1",
            "rudderMin": -45.04, "rudderMax": 45.06,
            "sailMin": 0.0, "sailMax": 88.88,
            "throttleMin": 0.0, "throttleMax": 100.0
        }));

        // Stored as submitted.
        let stored = registry.get("B1").unwrap().calibration.unwrap();
        assert_eq!(stored.rudder_min, -45.04);

        // Sent rounded to one decimal.
        let payload = decode(&rx.try_recv().unwrap());
        assert_eq!(payload["t"], "cal");
        assert_eq!(payload["rm"], -45.0);
        assert_eq!(payload["rx"], 45.1);
        assert_eq!(payload["sx"], 88.9);
    }

    #[tokio::test]
    async fn test_calibration_builds_a_probe_envelope() {
        let (router, mut rx, _, _, _) = make_router(8, Duration::from_secs(5));

        router.handle_test_calibration(&json!({
            "id": "B1", "type": "th", "value": 0.75
        }));

        let payload = decode(&rx.try_recv().unwrap());
        assert_eq!(payload["t"], "cal_test");
        assert_eq!(payload["ch"], "th");
        assert_eq!(payload["v"], 0.75);
    }

    #[tokio::test]
    async fn test_calibration_with_bogus_channel_is_dropped() {
        let (router, mut rx, _, _, _) = make_router(8, Duration::from_secs(5));
        router.handle_test_calibration(&json!({
            "id": "B1", "type": "warp", "value": 1.0
        }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn calibration_request_times_out_with_exactly_one_error_event() {
        let timeout = Duration::from_millis(100);
        let (router, _rx, _, bus, correlator) = make_router(8, timeout);
        let mut events = bus.subscribe();

        let started = Instant::now();
        router
            .handle_calibration_request(&json!({"id": "B9"}))
            .await;
        let elapsed = started.elapsed();

        // Not earlier than the bound, not wildly later.
        assert!(elapsed >= timeout, "error must wait out the full bound");
        assert!(elapsed < timeout * 10, "error must arrive promptly after the bound");

        match events.try_recv().unwrap() {
            ClientEvent::CalibrationDataResponse { id, data, error } => {
                assert_eq!(id, "B9");
                assert!(data.is_none());
                assert!(error.unwrap().contains("timeout"));
            }
            other => panic!("expected CalibrationDataResponse, got {other:?}"),
        }
        // Exactly one event, and the waiter is gone.
        assert!(events.try_recv().is_err());
        assert_eq!(correlator.pending_count("B9"), 0);
    }

    #[tokio::test]
    async fn calibration_request_resolves_with_the_vehicle_profile() {
        let (router, mut rx, _, bus, correlator) = make_router(8, Duration::from_secs(5));
        let mut events = bus.subscribe();

        let request = tokio::spawn({
            let router = router.clone();
            async move {
                router
                    .handle_calibration_request(&json!({"id": "B1"}))
                    .await;
            }
        });

        // The request envelope reaches the outbound queue.
        let payload = decode(
            &tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap(),
        );
        assert_eq!(payload["t"], "req_cal_data");

        // The vehicle answers.
        correlator.resolve(
            "B1",
            CalibrationProfile {
                rudder_min: -45.0,
                rudder_max: 45.0,
                sail_min: 0.0,
                sail_max: 90.0,
                throttle_min: 0.0,
                throttle_max: 100.0,
            },
        );
        request.await.unwrap();

        match events.recv().await.unwrap() {
            ClientEvent::CalibrationDataResponse { id, data, error } => {
                assert_eq!(id, "B1");
                assert_eq!(data.unwrap().rudder_max, 45.0);
                assert!(error.is_none());
            }
            other => panic!("expected CalibrationDataResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn full_outbound_queue_drops_the_newest_command() {
        let (router, mut rx, _, _, _) = make_router(1, Duration::from_secs(5));

        router.handle_gui_data(&json!({"id": "B1", "md": "auto", "tlat": 1.0, "tlng": 1.0}));
        // Queue is full now; this one is dropped, not blocked on.
        router.handle_gui_data(&json!({"id": "B2", "md": "auto", "tlat": 2.0, "tlng": 2.0}));

        assert_eq!(rx.try_recv().unwrap().vehicle_id, "B1");
        assert!(rx.try_recv().is_err());
    }
}
