//! [`BroadcastPublisher`] – periodic full-fleet push.
//!
//! Clients never poll the registry.  They either receive this batch on
//! its short fixed interval or issue an on-demand list request, which
//! runs the identical projection once for the requesting client only.

use std::time::Duration;

use armada_fleet::{FleetRegistry, project_fleet};
use armada_types::ClientEvent;

use crate::bus::EventBus;

pub struct BroadcastPublisher {
    registry: FleetRegistry,
    bus: EventBus,
    interval: Duration,
    liveness_timeout: Duration,
}

impl BroadcastPublisher {
    pub fn new(
        registry: FleetRegistry,
        bus: EventBus,
        interval: Duration,
        liveness_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            bus,
            interval,
            liveness_timeout,
        }
    }

    /// Project the current snapshot and publish one batch event.
    /// Returns the number of vehicles in the batch.
    pub fn publish_once(&self) -> usize {
        let rows = project_fleet(&self.registry.snapshot(), self.liveness_timeout);
        let count = rows.len();
        self.bus.publish(ClientEvent::BoatLocations(rows));
        count
    }

    /// Publish forever on the configured interval.  Never returns during
    /// normal operation.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.publish_once();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armada_link::LinkAddress;
    use armada_types::{DEFAULT_LOCATION, Telemetry};

    #[tokio::test]
    async fn publish_once_pushes_the_whole_fleet_as_one_batch() {
        let registry = FleetRegistry::new();
        registry.upsert_on_contact("B1", LinkAddress::new("aa"));
        registry.upsert_on_contact("B2", LinkAddress::new("bb"));
        registry.merge_telemetry(
            "B2",
            &Telemetry {
                latitude: Some(37.9),
                longitude: Some(-122.4),
                ..Default::default()
            },
        );

        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let publisher = BroadcastPublisher::new(
            registry,
            bus.clone(),
            Duration::from_secs(1),
            Duration::from_secs(30),
        );

        assert_eq!(publisher.publish_once(), 2);

        match rx.recv().await.unwrap() {
            ClientEvent::BoatLocations(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].id, "B1");
                assert_eq!(rows[0].location, DEFAULT_LOCATION);
                assert_eq!(rows[0].status, "active");
                assert_eq!(rows[1].location.latitude, 37.9);
            }
            other => panic!("expected BoatLocations, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_loop_publishes_repeatedly() {
        let registry = FleetRegistry::new();
        registry.upsert_on_contact("B1", LinkAddress::new("aa"));

        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let publisher = BroadcastPublisher::new(
            registry,
            bus.clone(),
            Duration::from_millis(10),
            Duration::from_secs(30),
        );
        tokio::spawn(publisher.run());

        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("batch must keep arriving")
                .unwrap();
            assert!(matches!(event, ClientEvent::BoatLocations(_)));
        }
    }
}
