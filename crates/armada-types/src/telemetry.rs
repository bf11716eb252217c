//! Vehicle-reported data: the merged telemetry view and calibration
//! profiles.

use serde::{Deserialize, Serialize};

/// Merged telemetry view for a single vehicle.
///
/// Vehicles report their metrics across several wire subtypes, each
/// carrying a disjoint field set, so every field here is optional: a
/// message overwrites only the fields it carries and everything else keeps
/// its previous value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_dir: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag_z: Option<f64>,
}

impl Telemetry {
    /// Overlay `patch` onto `self`.  Only the fields the patch carries are
    /// overwritten; absent fields survive unchanged.
    pub fn merge(&mut self, patch: &Telemetry) {
        if let Some(v) = patch.latitude {
            self.latitude = Some(v);
        }
        if let Some(v) = patch.longitude {
            self.longitude = Some(v);
        }
        if let Some(v) = patch.wind_dir {
            self.wind_dir = Some(v);
        }
        if let Some(v) = patch.temperature {
            self.temperature = Some(v);
        }
        if let Some(v) = patch.heading {
            self.heading = Some(v);
        }
        if let Some(v) = patch.mag_x {
            self.mag_x = Some(v);
        }
        if let Some(v) = patch.mag_y {
            self.mag_y = Some(v);
        }
        if let Some(v) = patch.mag_z {
            self.mag_z = Some(v);
        }
    }

    /// Whether the vehicle has reported a complete GPS fix yet.
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Rudder / sail / throttle travel limits, submitted from the operator UI
/// or reported back by a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub rudder_min: f64,
    pub rudder_max: f64,
    pub sail_min: f64,
    pub sail_max: f64,
    pub throttle_min: f64,
    pub throttle_max: f64,
}

impl CalibrationProfile {
    /// Copy with every limit rounded to one decimal place, the precision
    /// the radio envelope carries.
    pub fn rounded(&self) -> Self {
        Self {
            rudder_min: round1(self.rudder_min),
            rudder_max: round1(self.rudder_max),
            sail_min: round1(self.sail_min),
            sail_max: round1(self.sail_max),
            throttle_min: round1(self.throttle_min),
            throttle_max: round1(self.throttle_max),
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
