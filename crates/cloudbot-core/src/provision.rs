//! Provision a server from its latest snapshot

use crate::catalog::SnapshotCatalog;
use crate::error::{Result, WorkflowError};
use crate::orchestrator::Orchestrator;
use crate::reply::{ReplySink, notify};
use cloudbot_cloud::{ActionOutcome, CreateServerRequest, ImageType};

impl Orchestrator {
    /// Recreate `server_name` from its snapshot
    ///
    /// Preconditions (snapshot, network identity) are checked before any
    /// mutation. Exactly one create call is issued and never retried. The
    /// returned outcome is the state of the create action when the wait
    /// ended; `TimedOut` leaves the remote create running.
    pub async fn provision(&self, server_name: &str, sink: &dyn ReplySink) -> Result<ActionOutcome> {
        let _lease = self.lease(server_name)?;

        let snapshots = self.provider.list_images(ImageType::Snapshot).await?;
        let catalog = SnapshotCatalog::from_images(snapshots);
        let image = catalog
            .get(server_name)
            .ok_or_else(|| WorkflowError::ImageNotFound(server_name.to_string()))?;

        let identity = self
            .identities
            .lookup(server_name)
            .ok_or_else(|| WorkflowError::NetworkIdentityNotFound(server_name.to_string()))?;

        let ssh_keys = self.provider.list_ssh_keys().await?;

        let request = CreateServerRequest {
            name: server_name.to_string(),
            location: self.settings.location.clone(),
            image_id: image.id,
            network_identity: identity,
            server_type: self.settings.server_type.clone(),
            ssh_keys,
        };
        tracing::info!(
            "Creating server {} from image {} ({})",
            server_name,
            image.id,
            image.description
        );
        let created = self
            .provider
            .create_server(&request)
            .await
            .map_err(|e| WorkflowError::CreateRejected(e.to_string()))?;

        notify(sink, &format!("Creating server with: {}", created.message)).await;

        let outcome = self
            .provider
            .wait_until_finished(&created.action, self.settings.action_timeout)
            .await;
        match &outcome {
            ActionOutcome::Succeeded => tracing::info!("Server {} created", server_name),
            ActionOutcome::Failed(e) => tracing::error!("Creating {} failed: {}", server_name, e),
            ActionOutcome::TimedOut => tracing::warn!(
                "Still waiting on create action {} for {} after {:?}",
                created.action.id,
                server_name,
                self.settings.action_timeout
            ),
        }
        Ok(outcome)
    }
}

/// Operator text for a finished provision
pub fn describe_outcome(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Succeeded => "Server created successfully".to_string(),
        ActionOutcome::Failed(error) => {
            format!("Error: server creation failed with: {}", error)
        }
        ActionOutcome::TimedOut => {
            "Warning: got bored waiting for server creation, over to you".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudbot_cloud::ActionError;

    #[test]
    fn test_outcome_texts_are_distinct() {
        let ok = describe_outcome(&ActionOutcome::Succeeded);
        let failed = describe_outcome(&ActionOutcome::Failed(ActionError::new(
            "server_limit",
            "limit reached",
        )));
        let timed_out = describe_outcome(&ActionOutcome::TimedOut);

        assert_eq!(ok, "Server created successfully");
        assert_eq!(
            failed,
            "Error: server creation failed with: limit reached (server_limit)"
        );
        assert!(timed_out.starts_with("Warning:"));
        assert_ne!(failed, timed_out);
    }
}
