//! [`CalibrationCorrelator`] – request/response joining over the
//! asynchronous radio.
//!
//! This is the one place where the inbound and outbound pipelines meet.
//! Each calibration request registers its own one-shot waiter, keyed by
//! vehicle identifier and tagged with a unique token; an inbound
//! `cal_data` envelope completes exactly the *oldest* pending waiter for
//! that vehicle.  Concurrent requests, whether for different vehicles or
//! the same one, can therefore never cross-satisfy each other, and a waiter
//! that times out deregisters itself so a late response cannot complete
//! a request that already failed.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use armada_types::CalibrationProfile;
use tokio::sync::oneshot;
use uuid::Uuid;

struct Waiter {
    token: Uuid,
    tx: oneshot::Sender<CalibrationProfile>,
}

/// Shared correlation table.  Clone it cheaply – all clones share the
/// same pending map.
#[derive(Clone, Default)]
pub struct CalibrationCorrelator {
    pending: Arc<Mutex<HashMap<String, VecDeque<Waiter>>>>,
}

impl CalibrationCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id`.  Returns the waiter's token (for
    /// [`forget`][Self::forget]) and the receiving end the caller awaits.
    pub fn register(&self, id: &str) -> (Uuid, oneshot::Receiver<CalibrationProfile>) {
        let (tx, rx) = oneshot::channel();
        let token = Uuid::new_v4();
        self.lock()
            .entry(id.to_string())
            .or_default()
            .push_back(Waiter { token, tx });
        (token, rx)
    }

    /// Complete the oldest live waiter for `id` with `profile`.
    ///
    /// Waiters whose receiving end has already been dropped are skipped.
    /// Returns whether any waiter was actually woken.
    pub fn resolve(&self, id: &str, profile: CalibrationProfile) -> bool {
        let mut pending = self.lock();
        let Some(queue) = pending.get_mut(id) else {
            return false;
        };
        let mut fired = false;
        while let Some(waiter) = queue.pop_front() {
            if waiter.tx.send(profile).is_ok() {
                fired = true;
                break;
            }
        }
        if queue.is_empty() {
            pending.remove(id);
        }
        fired
    }

    /// Remove a waiter that expired without firing.
    pub fn forget(&self, id: &str, token: Uuid) {
        let mut pending = self.lock();
        if let Some(queue) = pending.get_mut(id) {
            queue.retain(|waiter| waiter.token != token);
            if queue.is_empty() {
                pending.remove(id);
            }
        }
    }

    /// Number of waiters currently pending for `id`.
    pub fn pending_count(&self, id: &str) -> usize {
        self.lock().get(id).map_or(0, VecDeque::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Waiter>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}
