//! cloudbot lifecycle workflows
//!
//! Fleet status, provisioning from a snapshot and the
//! shutdown → snapshot → delete → cleanup decommission pipeline, written
//! against the provider-agnostic [`cloudbot_cloud::FleetProvider`].
//!
//! Workflows are stateless between commands: every invocation re-reads
//! provider state. The only shared mutable state is the [`LeaseRegistry`],
//! which keeps two workflows from touching the same server at once.

pub mod catalog;
pub mod decommission;
pub mod error;
pub mod format;
pub mod identity;
pub mod lease;
pub mod orchestrator;
pub mod provision;
pub mod reply;
pub mod status;

pub use catalog::SnapshotCatalog;
pub use decommission::{DecommissionRun, FailurePolicy, Step, StepOutcome};
pub use error::{ErrorKind, Result, WorkflowError};
pub use identity::{IdentityDirectory, StaticIdentityTable};
pub use lease::{Lease, LeaseRegistry};
pub use orchestrator::{Orchestrator, WorkflowSettings};
pub use provision::describe_outcome;
pub use reply::ReplySink;
pub use status::{FleetReport, ImageRow, ServerRow, StatusReporter};
