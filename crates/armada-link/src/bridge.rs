//! [`RadioBridge`] – owns the radio link and its background loops.
//!
//! The bridge is an explicit object with explicit state, handed by
//! reference to every component that needs the radio; there is no
//! module-level device handle or readiness flag.  It runs two long-lived
//! tasks:
//!
//! * **Dispatcher** ([`RadioBridge::run_dispatcher`]) – pumps inbound
//!   frames into the relay's queue and drains the outbound command queue
//!   into the link, resolving unicast vs broadcast per command.
//! * **Supervisor** ([`RadioBridge::run_supervisor`]) – retries `open` on
//!   a fixed interval whenever the link is not ready, promoting the
//!   bridge out of its degraded mode on success.
//!
//! Degraded mode is a first-class operating mode, not an error path:
//! reads yield nothing, writes are logged no-ops, and every downstream
//! component keeps running indefinitely.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use armada_types::ArmadaError;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::link::{AddressBook, RadioLink, RawFrame};

/// Cadence of the inbound poll inside the dispatcher loop.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Lifecycle state of the radio link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Never opened, or closed on shutdown.
    Closed,
    /// An open attempt is in flight.
    Opening,
    /// Frames flow.
    Ready,
    /// The link is unavailable; the supervisor is retrying.  Simulation
    /// mode: reads yield nothing, writes are logged no-ops.
    Degraded,
}

/// A command waiting for transmission, addressed by vehicle identifier.
/// Address resolution happens at send time, not enqueue time, so a
/// vehicle that registers while the command is queued still gets unicast
/// delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCommand {
    pub vehicle_id: String,
    pub payload: Vec<u8>,
}

/// Bridge between the radio link and the relay's frame queues.
pub struct RadioBridge {
    link: Mutex<Box<dyn RadioLink>>,
    addresses: Arc<dyn AddressBook>,
    state: RwLock<LinkState>,
    reconnect_interval: Duration,
}

impl RadioBridge {
    pub fn new(
        link: Box<dyn RadioLink>,
        addresses: Arc<dyn AddressBook>,
        reconnect_interval: Duration,
    ) -> Self {
        Self {
            link: Mutex::new(link),
            addresses,
            state: RwLock::new(LinkState::Closed),
            reconnect_interval,
        }
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: LinkState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Reconnect supervisor.  Attempts to open the link immediately, then
    /// re-attempts on a fixed interval for as long as the link is not
    /// ready.  Runs until the process exits.
    pub async fn run_supervisor(self: Arc<Self>) {
        loop {
            if self.state() != LinkState::Ready {
                self.set_state(LinkState::Opening);
                let result = self.link.lock().await.open().await;
                match result {
                    Ok(()) => {
                        self.set_state(LinkState::Ready);
                        info!("radio link ready");
                    }
                    Err(e) => {
                        self.set_state(LinkState::Degraded);
                        warn!(error = %e, "radio link unavailable, running in simulation mode");
                    }
                }
            }
            tokio::time::sleep(self.reconnect_interval).await;
        }
    }

    /// Dispatcher loop: forwards inbound frames into `inbound` and drains
    /// `outbound` into the link.  Returns when every outbound producer has
    /// been dropped (process shutdown).
    pub async fn run_dispatcher(
        self: Arc<Self>,
        inbound: mpsc::Sender<RawFrame>,
        mut outbound: mpsc::Receiver<OutboundCommand>,
    ) {
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                maybe = outbound.recv() => match maybe {
                    Some(command) => self.transmit(command).await,
                    None => break,
                },
                _ = poll.tick() => self.pump_inbound(&inbound).await,
            }
        }
    }

    async fn pump_inbound(&self, inbound: &mpsc::Sender<RawFrame>) {
        if self.state() != LinkState::Ready {
            return;
        }
        let mut link = self.link.lock().await;
        loop {
            match link.read_frame().await {
                Ok(Some(frame)) => match inbound.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(frame)) => {
                        // Documented drop-newest policy under backpressure.
                        warn!(source = %frame.source, "inbound queue full, dropping newest frame");
                    }
                    Err(TrySendError::Closed(_)) => return,
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "radio read failed, degrading link");
                    self.set_state(LinkState::Degraded);
                    break;
                }
            }
        }
    }

    /// Resolve and transmit one queued command: unicast when the vehicle
    /// has a known address, broadcast otherwise so that commands issued
    /// before a vehicle's first contact are not silently dropped.
    async fn transmit(&self, command: OutboundCommand) {
        if self.state() != LinkState::Ready {
            debug!(
                vehicle = %command.vehicle_id,
                payload = %String::from_utf8_lossy(&command.payload),
                "link not ready, simulating send"
            );
            return;
        }

        let mut link = self.link.lock().await;
        let result = match self.addresses.address_of(&command.vehicle_id) {
            Some(address) => {
                debug!(vehicle = %command.vehicle_id, %address, "unicast send");
                link.send(&address, &command.payload).await
            }
            None => {
                debug!(vehicle = %command.vehicle_id, "vehicle address unknown, broadcasting");
                link.broadcast(&command.payload).await
            }
        };
        if let Err(e) = result {
            warn!(vehicle = %command.vehicle_id, error = %e, "radio write failed, degrading link");
            self.set_state(LinkState::Degraded);
        }
    }

    /// Best-effort clean close on shutdown.
    pub async fn close(&self) {
        self.link.lock().await.close().await;
        self.set_state(LinkState::Closed);
    }
}
