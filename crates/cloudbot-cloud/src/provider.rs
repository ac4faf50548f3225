//! Fleet provider trait definition

use crate::action::{ActionHandle, ActionOutcome};
use crate::error::Result;
use crate::model::{
    CreateServerRequest, CreatedImage, CreatedServer, ImageRecord, ImageType, ServerRecord, SshKey,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Interval between action polls used by [`FleetProvider::wait_until_finished`]
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fleet provider abstraction trait
///
/// Implementations are shared read-only between concurrent workflows, so
/// every method takes `&self`. The provider is the source of truth and
/// arbitrates concurrent mutations itself.
#[async_trait]
pub trait FleetProvider: Send + Sync {
    /// Returns the provider name (e.g., "hetzner")
    fn name(&self) -> &str;

    async fn list_servers(&self) -> Result<Vec<ServerRecord>>;

    async fn list_images(&self, image_type: ImageType) -> Result<Vec<ImageRecord>>;

    async fn get_server_by_name(&self, name: &str) -> Result<Option<ServerRecord>>;

    async fn list_ssh_keys(&self) -> Result<Vec<SshKey>>;

    async fn create_server(&self, request: &CreateServerRequest) -> Result<CreatedServer>;

    /// Request a graceful (ACPI) shutdown
    async fn shutdown_server(&self, server: &ServerRecord) -> Result<ActionHandle>;

    async fn create_image(
        &self,
        server: &ServerRecord,
        description: &str,
        image_type: ImageType,
    ) -> Result<CreatedImage>;

    async fn delete_server(&self, server: &ServerRecord) -> Result<ActionHandle>;

    /// Delete an image. `None` means the provider completed the deletion
    /// synchronously and there is nothing to wait for.
    async fn delete_image(&self, image: &ImageRecord) -> Result<Option<ActionHandle>>;

    /// Fetch the current state of an action
    async fn get_action(&self, id: u64) -> Result<ActionHandle>;

    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// Wait for an action to reach a terminal state
    ///
    /// Polls [`get_action`](Self::get_action) until the action finishes or
    /// `timeout` elapses. Poll errors are treated as transient and retried
    /// until the deadline.
    async fn wait_until_finished(&self, handle: &ActionHandle, timeout: Duration) -> ActionOutcome {
        if let Some(outcome) = handle.outcome() {
            return outcome;
        }

        let deadline = Instant::now() + timeout;
        let interval = self.poll_interval();

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(
                    "Gave up waiting for action {} ({}) after {:?}",
                    handle.id,
                    handle.command,
                    timeout
                );
                return ActionOutcome::TimedOut;
            }

            tokio::time::sleep(interval.min(deadline - now)).await;

            match self.get_action(handle.id).await {
                Ok(current) => {
                    if let Some(outcome) = current.outcome() {
                        tracing::debug!("Action {} finished: {}", handle.id, current.status);
                        return outcome;
                    }
                }
                Err(e) => {
                    tracing::warn!("Polling action {} failed: {}", handle.id, e);
                }
            }
        }
    }
}
