//! Hetzner Cloud provider for cloudbot
//!
//! This crate implements the `FleetProvider` trait on top of the Hetzner
//! Cloud REST API.
//!
//! # Features
//!
//! - Server management (create from snapshot, shutdown, delete)
//! - Snapshot images (create, list, delete)
//! - SSH keys and action polling
//!
//! # Requirements
//!
//! - An API token with read/write permission for the project
//!
//! # Example
//!
//! ```ignore
//! use cloudbot_cloud::{FleetProvider, ImageType};
//! use cloudbot_cloud_hetzner::{HetznerConfig, HetznerProvider};
//!
//! let provider = HetznerProvider::new(HetznerConfig::new(token))?;
//! let snapshots = provider.list_images(ImageType::Snapshot).await?;
//! ```

pub mod api;
pub mod error;
pub mod provider;

pub use api::{HetznerApi, HetznerConfig, HETZNER_API_BASE};
pub use error::{HetznerError, Result};
pub use provider::HetznerProvider;
