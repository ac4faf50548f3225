//! Per-server exclusive leases
//!
//! A lease is held for the whole lifetime of a provision or decommission
//! workflow. Release happens on drop, so every exit path (success, error,
//! abort, or the caller dropping a half-consumed pipeline) frees the name.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

type Held = Arc<Mutex<HashSet<String>>>;

fn lock(held: &Held) -> MutexGuard<'_, HashSet<String>> {
    held.lock().unwrap_or_else(|e| e.into_inner())
}

/// Registry of server names currently owned by a workflow
#[derive(Debug, Clone, Default)]
pub struct LeaseRegistry {
    held: Held,
}

impl LeaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease for `server_name`, or `None` if another workflow holds it
    pub fn try_acquire(&self, server_name: &str) -> Option<Lease> {
        if !lock(&self.held).insert(server_name.to_string()) {
            tracing::debug!("Lease for {} is already held", server_name);
            return None;
        }
        tracing::debug!("Acquired lease for {}", server_name);
        Some(Lease {
            server_name: server_name.to_string(),
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self, server_name: &str) -> bool {
        lock(&self.held).contains(server_name)
    }
}

/// RAII guard for a server lease
#[derive(Debug)]
pub struct Lease {
    server_name: String,
    held: Held,
}

impl Lease {
    pub fn server_name(&self) -> &str {
        &self.server_name
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        lock(&self.held).remove(&self.server_name);
        tracing::debug!("Released lease for {}", self.server_name);
    }
}
