//! [`GatewayServer`] – WebSocket server for live web clients.
//!
//! Listens on `0.0.0.0:3336` (configurable via
//! [`GatewayServer::with_port`]).  Each connection gets its own task that
//! bridges the event bus to the socket and parses upstream requests; a
//! slow or dead client only ever loses its own events.

use std::net::SocketAddr;
use std::time::Duration;

use armada_fleet::{FleetRegistry, project_fleet};
use armada_relay::{CommandRouter, EventBus};
use armada_types::{ArmadaError, ClientEvent};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::clients::ClientDirectory;

/// Default TCP port for the client gateway.
pub const DEFAULT_PORT: u16 = 3336;

/// Upstream requests a web client may issue.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ClientRequest {
    BoatList,
    GuiData(Value),
    CalibrationRequest(Value),
    CalibrationSubmit(Value),
    CalibrationTest(Value),
}

/// Split an upstream `{event, data}` frame into a typed request.
/// Unrecognised events and unparseable frames yield `None`.
pub(crate) fn parse_request(text: &str) -> Option<ClientRequest> {
    let json: Value = serde_json::from_str(text).ok()?;
    let event = json.get("event")?.as_str()?;
    let data = json.get("data").cloned().unwrap_or(Value::Null);
    match event {
        "request_boat_list" => Some(ClientRequest::BoatList),
        "gui_data" => Some(ClientRequest::GuiData(data)),
        "request_calibration_data" => Some(ClientRequest::CalibrationRequest(data)),
        "calibration_data" => Some(ClientRequest::CalibrationSubmit(data)),
        "test_calibration" => Some(ClientRequest::CalibrationTest(data)),
        _ => None,
    }
}

/// WebSocket gateway bridging the event bus to every connected client.
#[derive(Clone)]
pub struct GatewayServer {
    bus: EventBus,
    registry: FleetRegistry,
    router: CommandRouter,
    clients: ClientDirectory,
    port: u16,
    liveness_timeout: Duration,
}

impl GatewayServer {
    pub fn new(
        bus: EventBus,
        registry: FleetRegistry,
        router: CommandRouter,
        liveness_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            registry,
            router,
            clients: ClientDirectory::new(),
            port: DEFAULT_PORT,
            liveness_timeout,
        }
    }

    /// Override the listening port (builder-style).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn clients(&self) -> &ClientDirectory {
        &self.clients
    }

    /// Accept connections forever.
    ///
    /// # Errors
    ///
    /// Returns [`ArmadaError::Channel`] if the TCP listener cannot bind.
    pub async fn run(self) -> Result<(), ArmadaError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ArmadaError::Channel(format!("gateway bind error on {addr}: {e}")))?;
        info!(port = self.port, "client gateway listening");

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_client(stream, peer).await {
                            warn!(%peer, error = %e, "client connection error");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "gateway accept error");
                }
            }
        }
    }

    async fn handle_client(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), ArmadaError> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| ArmadaError::Channel(format!("ws handshake from {peer}: {e}")))?;
        let session = self.clients.connect(peer);
        info!(%peer, %session, "client connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let mut events = self.bus.subscribe();

        // Greeting so the UI knows the relay is alive.
        let greeting = ClientEvent::ServerResponse {
            message: "connection established".to_string(),
        };
        if ws_tx
            .send(Message::Text(greeting.to_frame().into()))
            .await
            .is_err()
        {
            self.clients.disconnect(&session);
            return Ok(());
        }

        loop {
            tokio::select! {
                // ── Downstream: event bus → client ─────────────────────────
                result = events.recv() => {
                    match result {
                        Ok(event) => {
                            if ws_tx.send(Message::Text(event.to_frame().into())).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(%peer, lagged_by = n, "slow client lagged behind the event stream");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                // ── Upstream: client → command pipeline ────────────────────
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(reply) = self.handle_request(text.as_str()) {
                                if ws_tx.send(Message::Text(reply.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        _ => {}
                    }
                }
            }
        }

        if let Some(record) = self.clients.disconnect(&session) {
            info!(
                %peer,
                %session,
                connected_at = %record.connect_time,
                "client disconnected"
            );
        }
        Ok(())
    }

    /// Apply one upstream request.
    ///
    /// Returns a frame destined for the requesting client only (the
    /// on-demand boat list); everything else is routed into the shared
    /// pipeline and any response arrives via the event bus.
    fn handle_request(&self, text: &str) -> Option<String> {
        let Some(request) = parse_request(text) else {
            debug!("ignoring unrecognised client frame");
            return None;
        };
        match request {
            ClientRequest::BoatList => {
                // Same projection the periodic broadcast uses, run once,
                // synchronously, for this client.
                let rows = project_fleet(&self.registry.snapshot(), self.liveness_timeout);
                Some(ClientEvent::BoatLocations(rows).to_frame())
            }
            ClientRequest::GuiData(data) => {
                self.router.handle_gui_data(&data);
                None
            }
            ClientRequest::CalibrationSubmit(data) => {
                self.router.handle_calibration_data(&data);
                None
            }
            ClientRequest::CalibrationTest(data) => {
                self.router.handle_test_calibration(&data);
                None
            }
            ClientRequest::CalibrationRequest(data) => {
                // Bounded wait; run it off this client's loop so other
                // requests keep flowing.  The response event reaches every
                // subscriber through the bus.
                let router = self.router.clone();
                tokio::spawn(async move {
                    router.handle_calibration_request(&data).await;
                });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armada_link::{LinkAddress, OutboundCommand};
    use armada_relay::CalibrationCorrelator;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn make_server() -> (GatewayServer, mpsc::Receiver<OutboundCommand>, FleetRegistry) {
        let registry = FleetRegistry::new();
        let bus = EventBus::default();
        let (tx, rx) = mpsc::channel(8);
        let router = CommandRouter::new(
            registry.clone(),
            tx,
            bus.clone(),
            CalibrationCorrelator::new(),
            Duration::from_millis(100),
        );
        let server = GatewayServer::new(bus, registry.clone(), router, Duration::from_secs(30));
        (server, rx, registry)
    }

    // ── Constructor ──────────────────────────────────────────────────────

    #[test]
    fn default_port_is_3336() {
        let (server, _, _) = make_server();
        assert_eq!(server.port(), DEFAULT_PORT);
    }

    #[test]
    fn with_port_overrides_default() {
        let (server, _, _) = make_server();
        assert_eq!(server.with_port(9999).port(), 9999);
    }

    // ── Upstream request parsing ─────────────────────────────────────────

    #[test]
    fn parse_request_recognises_every_event() {
        assert_eq!(
            parse_request(r#"{"event":"request_boat_list"}"#),
            Some(ClientRequest::BoatList)
        );
        assert!(matches!(
            parse_request(r#"{"event":"gui_data","data":{"id":"B1"}}"#),
            Some(ClientRequest::GuiData(_))
        ));
        assert!(matches!(
            parse_request(r#"{"event":"request_calibration_data","data":{"id":"B1"}}"#),
            Some(ClientRequest::CalibrationRequest(_))
        ));
        assert!(matches!(
            parse_request(r#"{"event":"calibration_data","data":{"id":"B1"}}"#),
            Some(ClientRequest::CalibrationSubmit(_))
        ));
        assert!(matches!(
            parse_request(r#"{"event":"test_calibration","data":{"id":"B1"}}"#),
            Some(ClientRequest::CalibrationTest(_))
        ));
    }

    #[test]
    fn parse_request_ignores_unknown_events_and_garbage() {
        assert_eq!(parse_request(r#"{"event":"subscribe_everything"}"#), None);
        assert_eq!(parse_request("not json at all"), None);
        assert_eq!(parse_request(r#"{"data":{"id":"B1"}}"#), None);
    }

    // ── Request handling ─────────────────────────────────────────────────

    #[tokio::test]
    async fn boat_list_request_answers_the_requesting_client_directly() {
        let (server, _, registry) = make_server();
        registry.upsert_on_contact("B1", LinkAddress::new("aa"));

        let reply = server
            .handle_request(r#"{"event":"request_boat_list"}"#)
            .expect("list request must be answered inline");
        let frame: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(frame["event"], "boat_locations");
        assert_eq!(frame["data"][0]["id"], "B1");
        // No fix yet → the documented placeholder coordinate.
        assert_eq!(frame["data"][0]["location"]["latitude"], 37.86118);
    }

    #[tokio::test]
    async fn gui_data_request_lands_on_the_outbound_queue() {
        let (server, mut rx, _) = make_server();

        let frame = json!({
            "event": "gui_data",
            "data": {"id": "B2", "md": "auto", "tlat": 10.0, "tlng": 20.0}
        })
        .to_string();
        assert!(server.handle_request(&frame).is_none());

        let command = rx.try_recv().expect("command must be queued");
        assert_eq!(command.vehicle_id, "B2");
        let payload: Value = serde_json::from_slice(&command.payload).unwrap();
        assert_eq!(payload["md"], "auto");
    }

    #[tokio::test]
    async fn calibration_request_runs_off_loop_and_publishes_the_timeout() {
        let (server, mut rx, _) = make_server();
        let mut events = server.bus.subscribe();

        let frame = json!({
            "event": "request_calibration_data",
            "data": {"id": "B9"}
        })
        .to_string();
        assert!(server.handle_request(&frame).is_none());

        // The request envelope goes out...
        let command = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let payload: Value = serde_json::from_slice(&command.payload).unwrap();
        assert_eq!(payload["t"], "req_cal_data");

        // ...and with no vehicle answering, the error event arrives on
        // the bus after the (short test) timeout.
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timeout error event must be published")
            .unwrap();
        assert!(matches!(
            event,
            ClientEvent::CalibrationDataResponse { data: None, .. }
        ));
    }

    #[tokio::test]
    async fn unrecognised_frames_produce_no_reply_and_no_command() {
        let (server, mut rx, _) = make_server();
        assert!(server.handle_request(r#"{"event":"warp_drive"}"#).is_none());
        assert!(rx.try_recv().is_err());
    }
}
