//! cloudbot fleet provider abstraction
//!
//! This crate defines the provider-agnostic contract the lifecycle
//! workflows are written against: server/image records, asynchronous
//! action handles and the [`FleetProvider`] trait itself.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              cloudbot (dispatcher)               │
//! │            status / start / stop                 │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                cloudbot-core                     │
//! │   StatusReporter · provision · decommission      │
//! └─────────────────┬───────────────────────────────┘
//!                   │  trait FleetProvider
//! ┌─────────────────▼───────────────────────────────┐
//! │                cloudbot-cloud                    │
//! │   records · ActionHandle · wait_until_finished   │
//! └───────┬─────────────────────────┬───────────────┘
//!         │                         │
//! ┌───────▼────────┐       ┌────────▼───────┐
//! │ hetzner (REST) │       │ fake (tests)   │
//! └────────────────┘       └────────────────┘
//! ```

pub mod action;
pub mod error;
pub mod model;
pub mod provider;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

// Re-exports
pub use action::{ActionError, ActionHandle, ActionOutcome, ActionStatus};
pub use error::{CloudError, Result};
pub use model::{
    CreateServerRequest, CreatedImage, CreatedServer, ImageRecord, ImageType, NetworkIdentity,
    ServerRecord, ServerStatus, SshKey,
};
pub use provider::{DEFAULT_POLL_INTERVAL, FleetProvider};
