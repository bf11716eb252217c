//! `armada-link` – The Radio Transport Bridge
//!
//! Owns everything that touches the physical radio: the [`RadioLink`]
//! backend seam, the TCP modem-daemon link, the simulation link used when
//! no modem is attached, and the [`RadioBridge`] that runs the reader /
//! writer loops and the reconnect supervisor.
//!
//! The bridge is deliberately ignorant of what the payloads mean.  It
//! moves raw frames between the radio and the relay's queues, and resolves
//! unicast vs broadcast delivery through the [`AddressBook`] seam.

pub mod bridge;
pub mod link;
pub mod sim;
pub mod tcp;

pub use bridge::{LinkState, OutboundCommand, RadioBridge};
pub use link::{AddressBook, LinkAddress, RadioLink, RawFrame};
pub use sim::SimLink;
pub use tcp::TcpModemLink;
