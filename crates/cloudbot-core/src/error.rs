//! Workflow error types

use cloudbot_cloud::CloudError;
use thiserror::Error;

/// Errors that end a workflow invocation
///
/// None of these are fatal to the process; each is scoped to the single
/// command that produced it.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("invalid server name `{0}`: names must be non-empty and must not contain `-`")]
    InvalidServerName(String),

    #[error("could not find snapshot image for server `{0}`")]
    ImageNotFound(String),

    #[error("no network identity configured for server `{0}`")]
    NetworkIdentityNotFound(String),

    #[error("could not find server `{0}`")]
    ServerNotFound(String),

    #[error("creating server failed: {0}")]
    CreateRejected(String),

    #[error("another workflow is already running for server `{0}`")]
    Busy(String),

    #[error("provider error: {0}")]
    Provider(#[from] CloudError),
}

/// Coarse classification of [`WorkflowError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local precondition failed before any remote call
    Precondition,
    /// Lookup miss on the provider
    NotFound,
    /// Remote API rejection
    Provider,
    /// Per-server lease already held
    Busy,
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::InvalidServerName(_)
            | WorkflowError::ImageNotFound(_)
            | WorkflowError::NetworkIdentityNotFound(_) => ErrorKind::Precondition,
            WorkflowError::ServerNotFound(_) => ErrorKind::NotFound,
            WorkflowError::CreateRejected(_) | WorkflowError::Provider(_) => ErrorKind::Provider,
            WorkflowError::Busy(_) => ErrorKind::Busy,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
