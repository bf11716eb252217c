//! Display projection of the fleet for web clients.
//!
//! Both the periodic broadcast and the on-demand list request go through
//! [`project_fleet`], so clients always see the same shape either way.

use std::time::Duration;

use armada_types::{BoatSummary, DEFAULT_LOCATION, Location};

use crate::registry::VehicleRecord;

const LABEL_ACTIVE: &str = "active";
const LABEL_INACTIVE: &str = "inactive";

/// Project a registry snapshot into per-vehicle display rows.
///
/// * Location falls back to [`DEFAULT_LOCATION`] until the vehicle has
///   reported a complete fix.
/// * The status label derives from liveness (`last_seen` against
///   `liveness_timeout`), independently of the status string the vehicle
///   reported in its heartbeat.
pub fn project_fleet(
    snapshot: &[(String, VehicleRecord)],
    liveness_timeout: Duration,
) -> Vec<BoatSummary> {
    snapshot
        .iter()
        .map(|(id, record)| BoatSummary {
            id: id.clone(),
            location: match (record.telemetry.latitude, record.telemetry.longitude) {
                (Some(latitude), Some(longitude)) => Location {
                    latitude,
                    longitude,
                },
                _ => DEFAULT_LOCATION,
            },
            status: if record.last_seen.elapsed() <= liveness_timeout {
                LABEL_ACTIVE
            } else {
                LABEL_INACTIVE
            }
            .to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FleetRegistry;
    use armada_link::LinkAddress;
    use armada_types::Telemetry;

    #[test]
    fn vehicles_without_a_fix_get_the_placeholder_coordinate() {
        let registry = FleetRegistry::new();
        registry.upsert_on_contact("B1", LinkAddress::new("aa"));

        let rows = project_fleet(&registry.snapshot(), Duration::from_secs(30));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location, DEFAULT_LOCATION);
    }

    #[test]
    fn reported_fix_wins_over_the_placeholder() {
        let registry = FleetRegistry::new();
        registry.upsert_on_contact("B1", LinkAddress::new("aa"));
        registry.merge_telemetry(
            "B1",
            &Telemetry {
                latitude: Some(37.9),
                longitude: Some(-122.4),
                ..Default::default()
            },
        );

        let rows = project_fleet(&registry.snapshot(), Duration::from_secs(30));
        assert_eq!(rows[0].location.latitude, 37.9);
        assert_eq!(rows[0].location.longitude, -122.4);
    }

    #[test]
    fn partial_fix_still_uses_the_placeholder() {
        let registry = FleetRegistry::new();
        registry.upsert_on_contact("B1", LinkAddress::new("aa"));
        registry.merge_telemetry(
            "B1",
            &Telemetry {
                latitude: Some(37.9),
                ..Default::default()
            },
        );

        let rows = project_fleet(&registry.snapshot(), Duration::from_secs(30));
        assert_eq!(rows[0].location, DEFAULT_LOCATION);
    }

    #[test]
    fn status_label_derives_from_liveness_not_reported_status() {
        let registry = FleetRegistry::new();
        registry.upsert_on_contact("B1", LinkAddress::new("aa"));
        registry.set_status("B1", "Reached Destination", "");

        // Fresh contact → active, whatever the vehicle said.
        let rows = project_fleet(&registry.snapshot(), Duration::from_secs(30));
        assert_eq!(rows[0].status, "active");

        // Silence past the timeout → inactive, same stored status.
        std::thread::sleep(Duration::from_millis(30));
        let rows = project_fleet(&registry.snapshot(), Duration::from_millis(10));
        assert_eq!(rows[0].status, "inactive");
    }
}
