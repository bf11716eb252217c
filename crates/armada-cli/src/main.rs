//! `armadad` – the armada fleet relay daemon.
//!
//! Wires the whole stack together and runs it until Ctrl-C:
//!
//! 1. Registry, event bus, calibration correlator, and the two bounded
//!    frame queues.
//! 2. The radio bridge (TCP modem link, or the simulation link when no
//!    modem is configured) with its supervisor and dispatcher loops.
//! 3. The processing loops: inbound dispatcher, liveness reaper, fleet
//!    broadcast publisher, telemetry requester.
//! 4. The WebSocket gateway for web clients.
//!
//! On shutdown the radio link is closed as a best-effort step.

mod config;
mod telemetry;

use std::sync::Arc;

use armada_fleet::{FleetRegistry, LivenessReaper};
use armada_gateway::GatewayServer;
use armada_link::{RadioBridge, RadioLink, SimLink, TcpModemLink};
use armada_relay::{
    BroadcastPublisher, CalibrationCorrelator, CommandRouter, DataRequester, EventBus,
    InboundDispatcher,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let _guard = telemetry::init_tracing("armadad");

    let cfg = config::load_or_default();
    let modem = if cfg.modem_addr.is_empty() {
        "<simulation>".to_string()
    } else {
        cfg.modem_addr.clone()
    };
    info!(
        gateway_port = cfg.gateway_port,
        modem = %modem,
        liveness_timeout_secs = cfg.liveness_timeout_secs,
        "starting armada relay"
    );

    // ── Shared state ──────────────────────────────────────────────────────
    let registry = FleetRegistry::new();
    let bus = EventBus::default();
    let correlator = CalibrationCorrelator::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(cfg.queue_capacity);
    let (outbound_tx, outbound_rx) = mpsc::channel(cfg.queue_capacity);

    // ── Radio side ────────────────────────────────────────────────────────
    let link: Box<dyn RadioLink> = if cfg.modem_addr.is_empty() {
        info!("no modem configured, radio runs in simulation mode");
        Box::new(SimLink::new())
    } else {
        Box::new(TcpModemLink::new(cfg.modem_addr.clone()))
    };
    let bridge = Arc::new(RadioBridge::new(
        link,
        Arc::new(registry.clone()),
        cfg.reconnect_interval(),
    ));
    tokio::spawn(Arc::clone(&bridge).run_supervisor());
    tokio::spawn(Arc::clone(&bridge).run_dispatcher(inbound_tx, outbound_rx));

    // ── Processing loops ──────────────────────────────────────────────────
    let dispatcher = InboundDispatcher::new(registry.clone(), bus.clone(), correlator.clone());
    tokio::spawn(dispatcher.run(inbound_rx));
    tokio::spawn(
        LivenessReaper::new(registry.clone(), cfg.liveness_timeout(), cfg.reap_interval()).run(),
    );
    tokio::spawn(
        BroadcastPublisher::new(
            registry.clone(),
            bus.clone(),
            cfg.broadcast_interval(),
            cfg.liveness_timeout(),
        )
        .run(),
    );
    tokio::spawn(
        DataRequester::new(
            registry.clone(),
            outbound_tx.clone(),
            cfg.data_request_interval(),
        )
        .run(),
    );

    // ── Client side ───────────────────────────────────────────────────────
    let router = CommandRouter::new(
        registry.clone(),
        outbound_tx,
        bus.clone(),
        correlator,
        cfg.calibration_timeout(),
    );
    let gateway = GatewayServer::new(bus, registry, router, cfg.liveness_timeout())
        .with_port(cfg.gateway_port);
    tokio::spawn(async move {
        if let Err(e) = gateway.run().await {
            // Without a gateway there is nothing to relay to; this is the
            // one operator-visible startup failure.
            error!(error = %e, "client gateway failed to start");
            std::process::exit(1);
        }
    });

    // ── Run until the operator stops us ───────────────────────────────────
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("ctrl-c received, shutting down"),
        Err(e) => warn!(error = %e, "could not listen for shutdown signal, exiting"),
    }
    bridge.close().await;
    info!("radio link closed, exiting");
}
