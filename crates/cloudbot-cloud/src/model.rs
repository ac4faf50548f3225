//! Fleet records exchanged with a provider

use crate::action::ActionHandle;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A compute instance as last reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: u64,
    pub name: String,
    pub status: ServerStatus,
    pub created_at: Option<DateTime<FixedOffset>>,
}

/// Lifecycle status of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Running,
    Initializing,
    Starting,
    Off,
    Stopping,
    Migrating,
    Rebuilding,
    Deleting,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServerStatus::Running => "running",
            ServerStatus::Initializing => "initializing",
            ServerStatus::Starting => "starting",
            ServerStatus::Off => "off",
            ServerStatus::Stopping => "stopping",
            ServerStatus::Migrating => "migrating",
            ServerStatus::Rebuilding => "rebuilding",
            ServerStatus::Deleting => "deleting",
            ServerStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Kind of disk image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageType {
    Snapshot,
    Backup,
    System,
    App,
    #[serde(other)]
    Unknown,
}

impl ImageType {
    /// Value used in provider query strings and request bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Snapshot => "snapshot",
            ImageType::Backup => "backup",
            ImageType::System => "system",
            ImageType::App => "app",
            ImageType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ImageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A disk image (snapshot, backup, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub description: String,
    pub size_bytes: Option<u64>,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub image_type: ImageType,
}

impl ImageRecord {
    /// Server name encoded in the description (`<server>-<tag>`)
    pub fn server_name(&self) -> &str {
        self.description
            .split_once('-')
            .map(|(name, _)| name)
            .unwrap_or(&self.description)
    }
}

/// Registered SSH public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    pub id: u64,
    pub name: String,
}

/// Reserved public address bound to a server name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub id: u64,
}

/// Parameters for creating a server from a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CreateServerRequest {
    pub name: String,
    pub location: String,
    pub image_id: u64,
    pub network_identity: NetworkIdentity,
    pub server_type: String,
    pub ssh_keys: Vec<SshKey>,
}

/// Accepted server creation
#[derive(Debug, Clone)]
pub struct CreatedServer {
    pub server_id: u64,
    pub action: ActionHandle,
    /// Human-readable description of what the provider is doing
    pub message: String,
}

/// Accepted image creation
#[derive(Debug, Clone)]
pub struct CreatedImage {
    pub image_id: u64,
    pub action: ActionHandle,
}
