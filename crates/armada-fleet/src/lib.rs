//! `armada-fleet` – Fleet State
//!
//! The concurrent registry of vehicle records, the periodic liveness
//! reaper that evicts silent vehicles, and the display projection that
//! turns registry snapshots into the rows web clients see.
//!
//! The registry is the single shared mutable resource of the whole relay;
//! every other component holds a cheap clone and goes through its atomic
//! operations.

pub mod projection;
pub mod reaper;
pub mod registry;

pub use projection::project_fleet;
pub use reaper::LivenessReaper;
pub use registry::{FleetRegistry, VehicleRecord};
