//! `armada-gateway` – The Web Client Gateway
//!
//! WebSocket server bridging the relay's event bus to every connected
//! web client:
//!
//! 1. **Pushes** every [`ClientEvent`] (fleet broadcasts, per-vehicle
//!    telemetry, calibration responses) to each connected client as
//!    `{event, data}` JSON frames, without letting a slow client block
//!    the others.
//!
//! 2. **Accepts** upstream requests (`request_boat_list`, `gui_data`,
//!    `request_calibration_data`, `calibration_data`, `test_calibration`)
//!    and routes them into the command pipeline.
//!
//! 3. **Tracks** connected sessions in a [`ClientDirectory`] (remote
//!    address and connect time; nothing vehicle-related).
//!
//! [`ClientEvent`]: armada_types::ClientEvent

pub mod clients;
pub mod server;

pub use clients::{ClientDirectory, ClientRecord};
pub use server::{DEFAULT_PORT, GatewayServer};
