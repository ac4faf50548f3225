//! Network identity lookup

use cloudbot_cloud::NetworkIdentity;
use std::collections::{BTreeMap, HashMap};

/// Resolves the reserved network identity for a server name
pub trait IdentityDirectory: Send + Sync {
    fn lookup(&self, server_name: &str) -> Option<NetworkIdentity>;
}

/// Fixed `server name → identity` table, usually built from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityTable {
    entries: HashMap<String, NetworkIdentity>,
}

impl StaticIdentityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, server_name: impl Into<String>, id: u64) -> Self {
        self.entries
            .insert(server_name.into(), NetworkIdentity { id });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&BTreeMap<String, u64>> for StaticIdentityTable {
    fn from(map: &BTreeMap<String, u64>) -> Self {
        Self {
            entries: map
                .iter()
                .map(|(name, id)| (name.clone(), NetworkIdentity { id: *id }))
                .collect(),
        }
    }
}

impl IdentityDirectory for StaticIdentityTable {
    fn lookup(&self, server_name: &str) -> Option<NetworkIdentity> {
        self.entries.get(server_name).copied()
    }
}
