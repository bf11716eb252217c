//! `armada-relay` – The Message Pipeline
//!
//! Connects the radio side of the system to the client side without
//! caring about either transport's mechanics:
//!
//! - [`bus`] – fire-and-forget event fan-out to subscribed web clients.
//! - [`dispatch`] – classifies inbound radio frames into registry
//!   mutations and client events.
//! - [`router`] – validates client commands and builds outbound radio
//!   envelopes.
//! - [`calibration`] – per-request correlation of calibration round
//!   trips over the asynchronous radio.
//! - [`publisher`] – periodic full-fleet snapshot push.
//! - [`requester`] – periodic telemetry poll of every known vehicle.

pub mod bus;
pub mod calibration;
pub mod dispatch;
pub mod publisher;
pub mod requester;
pub mod router;

pub use bus::EventBus;
pub use calibration::CalibrationCorrelator;
pub use dispatch::InboundDispatcher;
pub use publisher::BroadcastPublisher;
pub use requester::DataRequester;
pub use router::CommandRouter;
