//! Events pushed to subscribed web clients.
//!
//! Clients receive `{event, data}` JSON frames over their socket.  The
//! core never blocks on a slow client; publication is fire-and-forget
//! through the relay's event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::telemetry::{CalibrationProfile, Telemetry};

/// Geographic position shown on the operator map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Placeholder coordinate used until a vehicle reports its first fix.
/// A documented sentinel (the home marina), not a real position.
pub const DEFAULT_LOCATION: Location = Location {
    latitude: 37.86118,
    longitude: -122.35204,
};

/// One row of the periodic fleet broadcast: identifier, best-known
/// location, and the liveness-derived status label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoatSummary {
    pub id: String,
    pub location: Location,
    pub status: String,
}

/// Everything the core pushes to subscribed clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// `boat_locations` – batch snapshot of every known vehicle.
    BoatLocations(Vec<BoatSummary>),
    /// `boat_data` – single-vehicle merged telemetry push, stamped with
    /// the generation time.
    BoatData {
        id: String,
        data: Telemetry,
        timestamp: DateTime<Utc>,
    },
    /// `calibration_data_response` – correlated calibration reply, or an
    /// explicit timeout error.  Exactly one of `data`/`error` is set.
    CalibrationDataResponse {
        id: String,
        data: Option<CalibrationProfile>,
        error: Option<String>,
    },
    /// `server_response` – acknowledgement / status message.
    ServerResponse { message: String },
}

impl ClientEvent {
    /// Event name as it appears on the client socket.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::BoatLocations(_) => "boat_locations",
            ClientEvent::BoatData { .. } => "boat_data",
            ClientEvent::CalibrationDataResponse { .. } => "calibration_data_response",
            ClientEvent::ServerResponse { .. } => "server_response",
        }
    }

    /// Serialise into the `{event, data}` frame sent over the client
    /// socket.
    pub fn to_frame(&self) -> String {
        json!({"event": self.name(), "data": self.data_value()}).to_string()
    }

    fn data_value(&self) -> Value {
        match self {
            ClientEvent::BoatLocations(list) => {
                serde_json::to_value(list).unwrap_or(Value::Null)
            }
            ClientEvent::BoatData {
                id,
                data,
                timestamp,
            } => json!({
                "id": id,
                "data": data,
                "timestamp": timestamp.to_rfc3339(),
            }),
            ClientEvent::CalibrationDataResponse {
                id,
                data: Some(profile),
                ..
            } => json!({"id": id, "data": profile}),
            ClientEvent::CalibrationDataResponse { id, error, .. } => json!({
                "id": id,
                "error": error.clone().unwrap_or_else(|| "calibration data unavailable".to_string()),
            }),
            ClientEvent::ServerResponse { message } => json!({"message": message}),
        }
    }
}
