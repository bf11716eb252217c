//! [`FleetRegistry`] – concurrent map of vehicle state.
//!
//! Every operation is atomic: readers (snapshot, single-record get,
//! address lookup) always observe fully formed records, and writers are
//! serialised behind one mutex.  Records are created by
//! registration-on-first-contact, updated by every subsequent message
//! from the same identifier, and destroyed only by the liveness reaper.
//! The map never holds tombstones; an absent identifier simply means
//! "never seen".

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use armada_link::{AddressBook, LinkAddress};
use armada_types::{CalibrationProfile, Telemetry};
use tracing::info;

/// State held for one vehicle while it is considered reachable.
#[derive(Debug, Clone)]
pub struct VehicleRecord {
    /// Radio address learned from the vehicle's most recent frame.
    pub address: LinkAddress,
    /// Monotonic timestamp of the last inbound message.  Non-decreasing
    /// for as long as the record exists.
    pub last_seen: Instant,
    /// Last-reported operational status.
    pub status: String,
    /// Last-reported transient notification.
    pub notification: String,
    /// Merged telemetry view, built up incrementally per message subtype.
    pub telemetry: Telemetry,
    /// Last-submitted calibration profile.  Independent of telemetry; set
    /// only through explicit calibration submission.
    pub calibration: Option<CalibrationProfile>,
}

impl VehicleRecord {
    fn fresh(address: LinkAddress) -> Self {
        Self {
            address,
            last_seen: Instant::now(),
            status: "unknown".to_string(),
            notification: String::new(),
            telemetry: Telemetry::default(),
            calibration: None,
        }
    }
}

/// Shared fleet registry.  Clone it cheaply – all clones share the same
/// underlying map.
#[derive(Clone, Default)]
pub struct FleetRegistry {
    inner: Arc<Mutex<HashMap<String, VehicleRecord>>>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration-on-first-contact.
    ///
    /// Creates the record when `id` is unseen; otherwise only refreshes
    /// `last_seen` and the radio address; existing telemetry, status and
    /// calibration survive.  Applies uniformly no matter which message
    /// type made first contact, so callers never special-case "not yet
    /// registered".
    pub fn upsert_on_contact(&self, id: &str, address: LinkAddress) {
        let mut map = self.lock();
        match map.get_mut(id) {
            Some(record) => {
                record.last_seen = Instant::now();
                if record.address != address {
                    record.address = address;
                }
            }
            None => {
                info!(vehicle = %id, address = %address, "vehicle registered on first contact");
                map.insert(id.to_string(), VehicleRecord::fresh(address));
            }
        }
    }

    /// Overlay `patch` onto the vehicle's telemetry.  Fields the patch
    /// does not carry keep their previous value.  No-op for unknown
    /// identifiers.
    pub fn merge_telemetry(&self, id: &str, patch: &Telemetry) {
        if let Some(record) = self.lock().get_mut(id) {
            record.telemetry.merge(patch);
        }
    }

    /// Store the vehicle's reported status and transient notification.
    pub fn set_status(&self, id: &str, status: impl Into<String>, notification: impl Into<String>) {
        if let Some(record) = self.lock().get_mut(id) {
            record.status = status.into();
            record.notification = notification.into();
        }
    }

    /// Store a calibration profile for the vehicle.
    pub fn set_calibration(&self, id: &str, profile: CalibrationProfile) {
        if let Some(record) = self.lock().get_mut(id) {
            record.calibration = Some(profile);
        }
    }

    /// Clone of a single record, if the vehicle is currently known.
    pub fn get(&self, id: &str) -> Option<VehicleRecord> {
        self.lock().get(id).cloned()
    }

    /// Consistent point-in-time copy of the whole fleet, ordered by
    /// identifier.
    pub fn snapshot(&self) -> Vec<(String, VehicleRecord)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Drop a single record.
    pub fn remove(&self, id: &str) {
        self.lock().remove(id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every record whose silence exceeds `timeout` and return the
    /// removed identifiers.
    ///
    /// One atomic pass: a vehicle whose frame is in flight is either
    /// refreshed before the sweep takes the lock (and survives) or
    /// re-registers afterwards as a brand-new record.
    pub fn reap(&self, timeout: Duration) -> Vec<String> {
        let mut map = self.lock();
        let stale: Vec<String> = map
            .iter()
            .filter(|(_, record)| record.last_seen.elapsed() > timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            map.remove(id);
        }
        stale
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VehicleRecord>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AddressBook for FleetRegistry {
    fn address_of(&self, id: &str) -> Option<LinkAddress> {
        self.lock().get(id).map(|record| record.address.clone())
    }
}
