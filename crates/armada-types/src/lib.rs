//! `armada-types` – Shared Vocabulary
//!
//! Core data model for the armada fleet relay: the radio wire envelope,
//! the per-vehicle telemetry view, calibration profiles, the events pushed
//! to subscribed web clients, and the error taxonomy shared by every crate.

pub mod event;
pub mod telemetry;
pub mod wire;

pub use event::{BoatSummary, ClientEvent, DEFAULT_LOCATION, Location};
pub use telemetry::{CalibrationProfile, Telemetry};
pub use wire::{CalChannel, CommandMode, WireMessage};

use thiserror::Error;

/// Global error type spanning radio transport faults, undecodable
/// envelopes, and calibration round-trip timeouts.
///
/// None of these conditions is fatal to the process: transport failures
/// push the link into its degraded mode, and per-message failures are
/// logged and dropped without stopping the processing loops.
#[derive(Error, Debug)]
pub enum ArmadaError {
    #[error("transport {stage} failure: {details}")]
    Transport {
        stage: &'static str,
        details: String,
    },

    #[error("undecodable envelope: {0}")]
    Decode(String),

    #[error("unknown message type '{tag}'")]
    UnknownType { tag: String },

    #[error("channel error: {0}")]
    Channel(String),

    #[error("no calibration response from '{id}' within the timeout")]
    CalibrationTimeout { id: String },
}

impl ArmadaError {
    /// Shorthand for a transport failure at the given stage
    /// (`"open"`, `"read"`, `"write"`, `"close"`).
    pub fn transport(stage: &'static str, details: impl ToString) -> Self {
        Self::Transport {
            stage,
            details: details.to_string(),
        }
    }
}
