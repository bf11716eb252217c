//! Simulation link for running without a radio modem attached.
//!
//! [`SimLink`] always opens, never yields a frame, and turns every write
//! into a logged no-op while recording the payload.  It backs the
//! explicit simulation mode (no modem configured) and the test suites;
//! the same behaviour keeps the whole stack runnable in CI with no
//! hardware on the bench.

use armada_types::ArmadaError;
use async_trait::async_trait;
use tracing::debug;

use crate::link::{LinkAddress, RadioLink, RawFrame};

/// A radio link that records transmissions instead of performing them.
#[derive(Default)]
pub struct SimLink {
    transmitted: Vec<Vec<u8>>,
}

impl SimLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads handed to `send` or `broadcast`, in order.
    pub fn transmitted(&self) -> &[Vec<u8>] {
        &self.transmitted
    }
}

#[async_trait]
impl RadioLink for SimLink {
    async fn open(&mut self) -> Result<(), ArmadaError> {
        debug!("simulated radio link open");
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<RawFrame>, ArmadaError> {
        Ok(None)
    }

    async fn send(&mut self, address: &LinkAddress, payload: &[u8]) -> Result<(), ArmadaError> {
        debug!(
            %address,
            payload = %String::from_utf8_lossy(payload),
            "simulating unicast send"
        );
        self.transmitted.push(payload.to_vec());
        Ok(())
    }

    async fn broadcast(&mut self, payload: &[u8]) -> Result<(), ArmadaError> {
        debug!(
            payload = %String::from_utf8_lossy(payload),
            "simulating broadcast send"
        );
        self.transmitted.push(payload.to_vec());
        Ok(())
    }

    async fn close(&mut self) {
        debug!("simulated radio link closed");
    }
}
