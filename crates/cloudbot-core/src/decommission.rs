//! Decommission pipeline
//!
//! ```text
//! Shutdown ──▶ Snapshot ──▶ Delete ──▶ Cleanup
//! continue     abort        continue   continue
//! ```
//!
//! The pipeline is a lazy stream: a step's remote calls are issued only
//! when the consumer polls for that step's outcome, so the caller can relay
//! every outcome to the operator before the next step starts. The per-server
//! lease lives inside the stream and is released when the last step has run
//! or the stream is dropped.

use crate::catalog::SnapshotCatalog;
use crate::error::{Result, WorkflowError};
use crate::lease::Lease;
use crate::orchestrator::{Orchestrator, WorkflowSettings};
use chrono::Utc;
use cloudbot_cloud::{
    ActionOutcome, FleetProvider, ImageRecord, ImageType, ServerRecord, ServerStatus,
};
use cloudbot_config::ShutdownSettle;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::Instant;

/// Decommission steps in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Shutdown,
    Snapshot,
    Delete,
    Cleanup,
}

/// What happens to the rest of the pipeline when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Continue,
    Abort,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Shutdown, Step::Snapshot, Step::Delete, Step::Cleanup];

    /// Failure policy table. A server is never deleted without a finished
    /// snapshot, so only the snapshot step aborts.
    pub fn on_failure(&self) -> FailurePolicy {
        match self {
            Step::Snapshot => FailurePolicy::Abort,
            Step::Shutdown | Step::Delete | Step::Cleanup => FailurePolicy::Continue,
        }
    }

    pub fn next(&self) -> Option<Step> {
        match self {
            Step::Shutdown => Some(Step::Snapshot),
            Step::Snapshot => Some(Step::Delete),
            Step::Delete => Some(Step::Cleanup),
            Step::Cleanup => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::Shutdown => "shutdown",
            Step::Snapshot => "snapshot",
            Step::Delete => "delete",
            Step::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one decommission step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    ShutdownOk,
    ShutdownFailed(String),
    SnapshotOk { image_id: u64, description: String },
    SnapshotFailed(String),
    /// The snapshot was accepted but had not finished when the wait ended
    SnapshotTimedOut {
        image_id: u64,
        description: String,
        waited_secs: u64,
    },
    DeleteOk,
    DeleteFailed(String),
    CleanupOk { image_id: u64 },
    CleanupSkipped,
    CleanupFailed(String),
}

impl StepOutcome {
    pub fn step(&self) -> Step {
        match self {
            StepOutcome::ShutdownOk | StepOutcome::ShutdownFailed(_) => Step::Shutdown,
            StepOutcome::SnapshotOk { .. }
            | StepOutcome::SnapshotFailed(_)
            | StepOutcome::SnapshotTimedOut { .. } => Step::Snapshot,
            StepOutcome::DeleteOk | StepOutcome::DeleteFailed(_) => Step::Delete,
            StepOutcome::CleanupOk { .. }
            | StepOutcome::CleanupSkipped
            | StepOutcome::CleanupFailed(_) => Step::Cleanup,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StepOutcome::ShutdownFailed(_)
                | StepOutcome::SnapshotFailed(_)
                | StepOutcome::DeleteFailed(_)
                | StepOutcome::CleanupFailed(_)
        )
    }

    /// The step's action may still finish on its own
    pub fn is_timeout(&self) -> bool {
        matches!(self, StepOutcome::SnapshotTimedOut { .. })
    }

    /// Whether no further step may run after this outcome
    pub fn halts_pipeline(&self) -> bool {
        (self.is_failure() || self.is_timeout())
            && self.step().on_failure() == FailurePolicy::Abort
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::ShutdownOk => write!(f, "Server shutdown. Now snapshotting.."),
            StepOutcome::ShutdownFailed(m) => write!(
                f,
                "Error shutting down server: {}\nSnapshotting and killing server..",
                m
            ),
            StepOutcome::SnapshotOk { description, .. } => {
                write!(f, "Server snapshotted as `{}`. Now killing..", description)
            }
            StepOutcome::SnapshotFailed(m) => {
                write!(f, "Error snapshotting server: {}\nAborting shutdown", m)
            }
            StepOutcome::SnapshotTimedOut {
                description,
                waited_secs,
                ..
            } => write!(
                f,
                "Warning: snapshot `{}` still running after {}s, not killing server\nCheck it and stop again",
                description, waited_secs
            ),
            StepOutcome::DeleteOk => write!(f, "Server killed. Now cleaning up image.."),
            StepOutcome::DeleteFailed(m) => {
                write!(f, "Error killing server: {}\nPlease kill again", m)
            }
            StepOutcome::CleanupOk { image_id } => {
                write!(f, "Old image `{}` deleted. All done", image_id)
            }
            StepOutcome::CleanupSkipped => write!(f, "No old image to clean up. All done"),
            StepOutcome::CleanupFailed(m) => write!(
                f,
                "Error cleaning up old image: {}\nPlease delete it manually",
                m
            ),
        }
    }
}

/// Lazy stream of [`StepOutcome`]s for one server
pub struct DecommissionRun {
    server: ServerRecord,
    outcomes: BoxStream<'static, StepOutcome>,
}

impl DecommissionRun {
    pub fn server(&self) -> &ServerRecord {
        &self.server
    }
}

impl Stream for DecommissionRun {
    type Item = StepOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StepOutcome>> {
        self.outcomes.poll_next_unpin(cx)
    }
}

impl Orchestrator {
    /// Start decommissioning `server_name`
    ///
    /// Only the lease and the server lookup happen here; every step runs
    /// as the returned stream is polled.
    pub async fn decommission(&self, server_name: &str) -> Result<DecommissionRun> {
        let lease = self.lease(server_name)?;
        let server = self
            .provider
            .get_server_by_name(server_name)
            .await?
            .ok_or_else(|| WorkflowError::ServerNotFound(server_name.to_string()))?;

        let pipeline = Pipeline {
            provider: Arc::clone(&self.provider),
            settings: Arc::clone(&self.settings),
            server: server.clone(),
            new_image_id: None,
            _lease: lease,
        };

        let outcomes = stream::unfold(Some((pipeline, Step::Shutdown)), |state| async move {
            let Some((mut pipeline, step)) = state else {
                return None;
            };
            let outcome = pipeline.run(step).await;
            let next = if outcome.halts_pipeline() {
                None
            } else {
                step.next()
            };
            Some((outcome, next.map(|step| (pipeline, step))))
        })
        .boxed();

        Ok(DecommissionRun { server, outcomes })
    }
}

struct Pipeline {
    provider: Arc<dyn FleetProvider>,
    settings: Arc<WorkflowSettings>,
    server: ServerRecord,
    new_image_id: Option<u64>,
    _lease: Lease,
}

impl Pipeline {
    async fn run(&mut self, step: Step) -> StepOutcome {
        tracing::debug!("Running {} step for {}", step, self.server.name);
        let outcome = match step {
            Step::Shutdown => self.shutdown().await,
            Step::Snapshot => self.snapshot().await,
            Step::Delete => self.delete().await,
            Step::Cleanup => self.cleanup().await,
        };
        if outcome.is_timeout() {
            tracing::warn!("{} of {} did not finish, aborting: {:?}", step, self.server.name, outcome);
        } else if outcome.halts_pipeline() {
            tracing::error!("{} of {} failed, aborting: {:?}", step, self.server.name, outcome);
        } else if outcome.is_failure() {
            tracing::warn!("{} of {} failed, continuing: {:?}", step, self.server.name, outcome);
        }
        outcome
    }

    /// Request shutdown, then let it settle before the snapshot
    ///
    /// The shutdown action itself is never awaited. A failed request still
    /// settles for the full duration.
    async fn shutdown(&mut self) -> StepOutcome {
        tracing::info!("Shutting down server {}", self.server.name);
        if let Err(e) = self.provider.shutdown_server(&self.server).await {
            self.sleep_settle().await;
            return StepOutcome::ShutdownFailed(e.to_string());
        }

        match self.settings.shutdown_settle {
            ShutdownSettle::Sleep => self.sleep_settle().await,
            ShutdownSettle::Poll => self.wait_until_off().await,
        }
        StepOutcome::ShutdownOk
    }

    async fn sleep_settle(&self) {
        tracing::debug!("Settling {} for {:?}", self.server.name, self.settings.settle);
        tokio::time::sleep(self.settings.settle).await;
    }

    /// Re-read the server until it reports `off`, at most for the settle
    /// duration. Lookup errors are retried.
    async fn wait_until_off(&self) {
        let deadline = Instant::now() + self.settings.settle;
        let interval = self.provider.poll_interval();

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(
                    "{} not off after {:?}, snapshotting anyway",
                    self.server.name,
                    self.settings.settle
                );
                return;
            }
            tokio::time::sleep(interval.min(deadline - now)).await;

            match self.provider.get_server_by_name(&self.server.name).await {
                Ok(Some(server)) if server.status == ServerStatus::Off => {
                    tracing::debug!("{} is off", self.server.name);
                    return;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Checking status of {} failed: {}", self.server.name, e),
            }
        }
    }

    async fn snapshot(&mut self) -> StepOutcome {
        let description = format!("{}-{}", self.server.name, Utc::now().format("%m-%d"));
        tracing::info!("Snapshotting {} as {}", self.server.name, description);

        let created = match self
            .provider
            .create_image(&self.server, &description, ImageType::Snapshot)
            .await
        {
            Ok(created) => created,
            Err(e) => return StepOutcome::SnapshotFailed(e.to_string()),
        };
        // Cleanup must never pick the image this run just created
        self.new_image_id = Some(created.image_id);

        match self
            .provider
            .wait_until_finished(&created.action, self.settings.action_timeout)
            .await
        {
            ActionOutcome::Succeeded => StepOutcome::SnapshotOk {
                image_id: created.image_id,
                description,
            },
            ActionOutcome::Failed(e) => StepOutcome::SnapshotFailed(e.to_string()),
            ActionOutcome::TimedOut => StepOutcome::SnapshotTimedOut {
                image_id: created.image_id,
                description,
                waited_secs: self.settings.action_timeout.as_secs(),
            },
        }
    }

    async fn delete(&self) -> StepOutcome {
        tracing::info!("Deleting server {}", self.server.name);
        match self.provider.delete_server(&self.server).await {
            Ok(_) => StepOutcome::DeleteOk,
            Err(e) => StepOutcome::DeleteFailed(e.to_string()),
        }
    }

    async fn cleanup(&self) -> StepOutcome {
        let snapshots = match self.provider.list_images(ImageType::Snapshot).await {
            Ok(images) => images,
            Err(e) => return StepOutcome::CleanupFailed(e.to_string()),
        };
        let catalog = SnapshotCatalog::from_images(snapshots.into_iter().filter(|image| {
            Some(image.id) != self.new_image_id && is_dated_snapshot_of(image, &self.server.name)
        }));
        let Some(old) = catalog.get(&self.server.name) else {
            tracing::debug!("No previous snapshot of {} to clean up", self.server.name);
            return StepOutcome::CleanupSkipped;
        };

        tracing::info!("Deleting old image {} ({})", old.id, old.description);
        match self.provider.delete_image(old).await {
            Ok(_) => StepOutcome::CleanupOk { image_id: old.id },
            Err(e) => StepOutcome::CleanupFailed(e.to_string()),
        }
    }
}

/// `<server>-MM-DD`, the shape of descriptions written by the snapshot step
fn is_dated_snapshot_of(image: &ImageRecord, server_name: &str) -> bool {
    let Some(tag) = image
        .description
        .strip_prefix(server_name)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return false;
    };
    match tag.as_bytes() {
        [m1, m2, b'-', d1, d2] => [m1, m2, d1, d2].iter().all(|b| b.is_ascii_digit()),
        _ => false,
    }
}
