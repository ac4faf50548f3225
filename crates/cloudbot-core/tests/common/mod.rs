use async_trait::async_trait;
use cloudbot_cloud::ServerStatus;
use cloudbot_cloud::fake::FakeProvider;
use cloudbot_core::{Orchestrator, ReplySink, StaticIdentityTable, WorkflowSettings};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[allow(dead_code)]
pub const NUB_IDENTITY: u64 = 48363362;

/// Sink that keeps every reply for later assertions
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSink {
    replies: Mutex<Vec<String>>,
}

impl RecordingSink {
    #[allow(dead_code)]
    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn reply(&self, text: &str) -> anyhow::Result<()> {
        self.replies.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// The `nub` fleet: one running server, one snapshot, one SSH key
pub fn nub_fleet() -> FakeProvider {
    FakeProvider::new()
        .with_server(1, "nub", ServerStatus::Running)
        .with_snapshot(149793636, "nub-02-16", Some("2024-02-16T10:00:00+00:00"))
        .with_ssh_key(7, "operator")
}

pub fn settings() -> WorkflowSettings {
    WorkflowSettings {
        settle: Duration::from_secs(30),
        action_timeout: Duration::from_secs(300),
        ..WorkflowSettings::default()
    }
}

pub fn orchestrator(provider: Arc<FakeProvider>, settings: WorkflowSettings) -> Orchestrator {
    let identities = StaticIdentityTable::new().with_entry("nub", NUB_IDENTITY);
    Orchestrator::new(provider, Arc::new(identities), settings)
}
