//! Thread-safe handle for hosts that share one network across threads
//!
//! Everything lives behind one mutex: merges read and write two apps and the
//! link set at once, so apps, links, and stream arming state must never be
//! locked separately. Listeners run while the lock is held and must not call
//! back into the same `SharedNetwork`.

use crate::registry::EmergenceNetwork;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct SharedNetwork {
    inner: Arc<Mutex<EmergenceNetwork>>,
}

impl SharedNetwork {
    pub fn new(network: EmergenceNetwork) -> Self {
        Self { inner: Arc::new(Mutex::new(network)) }
    }

    /// Lock the network. A poisoned lock is recovered: mutations commit
    /// before any listener runs and listener panics are caught, so the
    /// state behind a poisoned lock is still consistent.
    pub fn lock(&self) -> MutexGuard<'_, EmergenceNetwork> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut EmergenceNetwork) -> R) -> R {
        f(&mut self.lock())
    }
}

impl From<EmergenceNetwork> for SharedNetwork {
    fn from(network: EmergenceNetwork) -> Self {
        Self::new(network)
    }
}
