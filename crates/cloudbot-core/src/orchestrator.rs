//! Shared workflow context

use crate::error::{Result, WorkflowError};
use crate::identity::{IdentityDirectory, StaticIdentityTable};
use crate::lease::{Lease, LeaseRegistry};
use crate::status::{FleetReport, StatusReporter};
use cloudbot_cloud::FleetProvider;
use cloudbot_config::{Settings, ShutdownSettle};
use std::sync::Arc;
use std::time::Duration;

/// Immutable knobs the workflows read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub location: String,
    pub server_type: String,
    pub settle: Duration,
    pub shutdown_settle: ShutdownSettle,
    pub action_timeout: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            location: "hel1".to_string(),
            server_type: "ccx33".to_string(),
            settle: Duration::from_secs(30),
            shutdown_settle: ShutdownSettle::Sleep,
            action_timeout: Duration::from_secs(300),
        }
    }
}

impl From<&Settings> for WorkflowSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            location: settings.location.clone(),
            server_type: settings.server_type.clone(),
            settle: settings.settle(),
            shutdown_settle: settings.shutdown_settle,
            action_timeout: settings.action_timeout(),
        }
    }
}

/// Entry point for every workflow
///
/// Cheap to clone; clones share the provider, the identity directory and
/// the lease registry.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) provider: Arc<dyn FleetProvider>,
    pub(crate) identities: Arc<dyn IdentityDirectory>,
    pub(crate) settings: Arc<WorkflowSettings>,
    pub(crate) leases: LeaseRegistry,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn FleetProvider>,
        identities: Arc<dyn IdentityDirectory>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            provider,
            identities,
            settings: Arc::new(settings),
            leases: LeaseRegistry::new(),
        }
    }

    /// Build from loaded configuration, using its identity table
    pub fn from_settings(provider: Arc<dyn FleetProvider>, settings: &Settings) -> Self {
        let identities = StaticIdentityTable::from(&settings.network_identities);
        Self::new(
            provider,
            Arc::new(identities),
            WorkflowSettings::from(settings),
        )
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn leases(&self) -> &LeaseRegistry {
        &self.leases
    }

    pub fn provider(&self) -> &Arc<dyn FleetProvider> {
        &self.provider
    }

    /// Fleet report; runs without a lease
    pub async fn status(&self) -> Result<FleetReport> {
        StatusReporter::new(Arc::clone(&self.provider)).report().await
    }

    /// Validate the name and take its lease. Snapshot descriptions are
    /// `<server>-MM-DD`, so a `-` in the name would make them ambiguous.
    pub(crate) fn lease(&self, server_name: &str) -> Result<Lease> {
        if server_name.is_empty() || server_name.contains('-') {
            return Err(WorkflowError::InvalidServerName(server_name.to_string()));
        }
        self.leases
            .try_acquire(server_name)
            .ok_or_else(|| WorkflowError::Busy(server_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config_defaults() {
        let settings = WorkflowSettings::default();
        assert_eq!(settings.location, "hel1");
        assert_eq!(settings.server_type, "ccx33");
        assert_eq!(settings.settle, Duration::from_secs(30));
        assert_eq!(settings.shutdown_settle, ShutdownSettle::Sleep);
        assert_eq!(settings.action_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_lease_rejects_dashed_names() {
        let provider = Arc::new(cloudbot_cloud::fake::FakeProvider::new());
        let orchestrator = Orchestrator::new(
            provider,
            Arc::new(StaticIdentityTable::new()),
            WorkflowSettings::default(),
        );
        assert!(matches!(
            orchestrator.lease("web-2"),
            Err(WorkflowError::InvalidServerName(ref name)) if name == "web-2"
        ));
        assert!(matches!(
            orchestrator.lease(""),
            Err(WorkflowError::InvalidServerName(_))
        ));
        assert!(!orchestrator.leases().is_held("web-2"));
        assert!(orchestrator.lease("web").is_ok());
    }
}
