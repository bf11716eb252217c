//! Connected-client session directory.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Book-keeping for one connected web client.  Created on connect,
/// destroyed on disconnect; holds no reference to vehicle state.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub remote_address: SocketAddr,
    pub connect_time: DateTime<Utc>,
}

/// Shared session table.  Clone it cheaply – all clones share the same
/// map.
#[derive(Clone, Default)]
pub struct ClientDirectory {
    inner: Arc<Mutex<HashMap<Uuid, ClientRecord>>>,
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session and return its identifier.
    pub fn connect(&self, remote_address: SocketAddr) -> Uuid {
        let session = Uuid::new_v4();
        self.lock().insert(
            session,
            ClientRecord {
                remote_address,
                connect_time: Utc::now(),
            },
        );
        session
    }

    /// Drop a session, returning its record when it existed.
    pub fn disconnect(&self, session: &Uuid) -> Option<ClientRecord> {
        self.lock().remove(session)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, ClientRecord>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
