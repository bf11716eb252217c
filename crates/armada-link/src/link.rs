//! The radio backend seam.
//!
//! The bridge never talks to a concrete modem directly; it drives a
//! [`RadioLink`] trait object.  Backends translate between the modem's
//! own framing and [`RawFrame`] values, and nothing else.

use std::fmt;

use armada_types::ArmadaError;
use async_trait::async_trait;

/// Opaque transport-layer endpoint identifier: the radio network address
/// of one vehicle's modem (a 64-bit address rendered as hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkAddress(String);

impl LinkAddress {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw payload received from the radio, tagged with its source address.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub source: LinkAddress,
    pub payload: Vec<u8>,
}

/// Every radio backend (physical or simulated) implements this trait.
///
/// # Contract
///
/// * `open` – establish the link.  Failure is expected and non-fatal; the
///   bridge's supervisor retries on a fixed interval.
/// * `read_frame` – non-blocking poll: `Ok(None)` when nothing is
///   pending, `Err` when the link has been lost and must be reopened.
/// * `send` / `broadcast` – transmit one payload to a single modem or to
///   every modem in range.
/// * `close` – best-effort teardown; never fails.
#[async_trait]
pub trait RadioLink: Send + Sync {
    async fn open(&mut self) -> Result<(), ArmadaError>;

    async fn read_frame(&mut self) -> Result<Option<RawFrame>, ArmadaError>;

    async fn send(&mut self, address: &LinkAddress, payload: &[u8]) -> Result<(), ArmadaError>;

    async fn broadcast(&mut self, payload: &[u8]) -> Result<(), ArmadaError>;

    async fn close(&mut self);
}

/// Read-only address lookup the bridge uses to resolve unicast delivery.
/// Implemented by the fleet registry.
pub trait AddressBook: Send + Sync {
    /// The last-known radio address of `id`, if the vehicle has ever made
    /// contact.
    fn address_of(&self, id: &str) -> Option<LinkAddress>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_address_displays_its_raw_form() {
        let addr = LinkAddress::new("0013A20040A12345");
        assert_eq!(addr.to_string(), "0013A20040A12345");
        assert_eq!(addr.as_str(), "0013A20040A12345");
    }

    #[test]
    fn link_addresses_compare_by_value() {
        assert_eq!(LinkAddress::new("aa"), LinkAddress::new("aa"));
        assert_ne!(LinkAddress::new("aa"), LinkAddress::new("bb"));
    }
}
