//! In-memory provider for tests
//!
//! `FakeProvider` keeps a tiny fleet in memory, records every call and can
//! be scripted to reject operations or to leave actions running forever.

use crate::action::{ActionHandle, ActionOutcome, ActionStatus};
use crate::error::{CloudError, Result};
use crate::model::{
    CreateServerRequest, CreatedImage, CreatedServer, ImageRecord, ImageType, ServerRecord,
    ServerStatus, SshKey,
};
use crate::provider::FleetProvider;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Provider operation, used for scripting and for the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListServers,
    ListImages,
    GetServerByName,
    ListSshKeys,
    CreateServer,
    ShutdownServer,
    CreateImage,
    DeleteServer,
    DeleteImage,
    GetAction,
}

impl Operation {
    /// Whether the operation changes remote state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::CreateServer
                | Operation::ShutdownServer
                | Operation::CreateImage
                | Operation::DeleteServer
                | Operation::DeleteImage
        )
    }

    fn command(&self) -> &'static str {
        match self {
            Operation::CreateServer => "create_server",
            Operation::ShutdownServer => "shutdown_server",
            Operation::CreateImage => "create_image",
            Operation::DeleteServer => "delete_server",
            Operation::DeleteImage => "delete_image",
            _ => "read",
        }
    }
}

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub target: String,
}

#[derive(Debug, Clone)]
enum Script {
    Finish {
        remaining_polls: u32,
        outcome: ActionOutcome,
    },
    Never,
}

#[derive(Default)]
struct FakeState {
    servers: Vec<ServerRecord>,
    images: Vec<ImageRecord>,
    ssh_keys: Vec<SshKey>,
    failures: HashMap<Operation, (String, String)>,
    outcomes: HashMap<Operation, Option<ActionOutcome>>,
    actions: HashMap<u64, Script>,
    created: Vec<CreateServerRequest>,
    calls: Vec<Call>,
    next_id: u64,
}

impl FakeState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        1_000 + self.next_id
    }

    fn record(&mut self, operation: Operation, target: impl Into<String>) -> Result<()> {
        self.calls.push(Call {
            operation,
            target: target.into(),
        });
        match self.failures.get(&operation) {
            Some((code, message)) => Err(CloudError::api(code.clone(), message.clone())),
            None => Ok(()),
        }
    }

    fn new_action(&mut self, operation: Operation) -> ActionHandle {
        let id = self.next_id();
        let script = match self.outcomes.get(&operation) {
            Some(Some(outcome)) => Script::Finish {
                remaining_polls: 0,
                outcome: outcome.clone(),
            },
            Some(None) => Script::Never,
            None => Script::Finish {
                remaining_polls: 0,
                outcome: ActionOutcome::Succeeded,
            },
        };
        self.actions.insert(id, script);
        ActionHandle::running(id, operation.command())
    }
}

/// Scriptable in-memory [`FleetProvider`]
#[derive(Default)]
pub struct FakeProvider {
    state: Mutex<FakeState>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_server(self, id: u64, name: &str, status: ServerStatus) -> Self {
        self.state().servers.push(ServerRecord {
            id,
            name: name.to_string(),
            status,
            created_at: Some(Utc::now().fixed_offset()),
        });
        self
    }

    /// Add a snapshot image. `created_at` is RFC 3339; `None` leaves it unset.
    pub fn with_snapshot(self, id: u64, description: &str, created_at: Option<&str>) -> Self {
        let created_at = created_at
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok());
        self.state().images.push(ImageRecord {
            id,
            description: description.to_string(),
            size_bytes: Some(20_000_000_000),
            created_at,
            image_type: ImageType::Snapshot,
        });
        self
    }

    pub fn with_image(self, image: ImageRecord) -> Self {
        self.state().images.push(image);
        self
    }

    pub fn with_ssh_key(self, id: u64, name: &str) -> Self {
        self.state().ssh_keys.push(SshKey {
            id,
            name: name.to_string(),
        });
        self
    }

    /// Make every call of `operation` fail with a provider error
    pub fn fail(&self, operation: Operation, code: &str, message: &str) {
        self.state()
            .failures
            .insert(operation, (code.to_string(), message.to_string()));
    }

    /// Outcome reported for actions started by `operation`
    pub fn set_outcome(&self, operation: Operation, outcome: ActionOutcome) {
        self.state().outcomes.insert(operation, Some(outcome));
    }

    /// Leave actions started by `operation` running forever
    pub fn never_finish(&self, operation: Operation) {
        self.state().outcomes.insert(operation, None);
    }

    /// Register a running action that never finishes unless scripted
    pub fn start_action(&self, command: &str) -> ActionHandle {
        let mut state = self.state();
        let id = state.next_id();
        state.actions.insert(id, Script::Never);
        ActionHandle::running(id, command)
    }

    pub fn finish_action_after_polls(&self, id: u64, polls: u32, outcome: ActionOutcome) {
        self.state().actions.insert(
            id,
            Script::Finish {
                remaining_polls: polls.saturating_sub(1),
                outcome,
            },
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation.is_mutation())
            .collect()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.calls().into_iter().map(|c| c.operation).collect()
    }

    pub fn created_servers(&self) -> Vec<CreateServerRequest> {
        self.state().created.clone()
    }

    pub fn servers(&self) -> Vec<ServerRecord> {
        self.state().servers.clone()
    }

    pub fn images(&self) -> Vec<ImageRecord> {
        self.state().images.clone()
    }
}

#[async_trait]
impl FleetProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list_servers(&self) -> Result<Vec<ServerRecord>> {
        let mut state = self.state();
        state.record(Operation::ListServers, "*")?;
        Ok(state.servers.clone())
    }

    async fn list_images(&self, image_type: ImageType) -> Result<Vec<ImageRecord>> {
        let mut state = self.state();
        state.record(Operation::ListImages, image_type.as_str())?;
        Ok(state
            .images
            .iter()
            .filter(|i| i.image_type == image_type)
            .cloned()
            .collect())
    }

    async fn get_server_by_name(&self, name: &str) -> Result<Option<ServerRecord>> {
        let mut state = self.state();
        state.record(Operation::GetServerByName, name)?;
        Ok(state.servers.iter().find(|s| s.name == name).cloned())
    }

    async fn list_ssh_keys(&self) -> Result<Vec<SshKey>> {
        let mut state = self.state();
        state.record(Operation::ListSshKeys, "*")?;
        Ok(state.ssh_keys.clone())
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<CreatedServer> {
        let mut state = self.state();
        state.record(Operation::CreateServer, request.name.clone())?;
        state.created.push(request.clone());

        let server_id = state.next_id();
        state.servers.push(ServerRecord {
            id: server_id,
            name: request.name.clone(),
            status: ServerStatus::Initializing,
            created_at: Some(Utc::now().fixed_offset()),
        });
        let action = state.new_action(Operation::CreateServer);
        Ok(CreatedServer {
            server_id,
            message: action.command.clone(),
            action,
        })
    }

    async fn shutdown_server(&self, server: &ServerRecord) -> Result<ActionHandle> {
        let mut state = self.state();
        state.record(Operation::ShutdownServer, server.name.clone())?;
        if let Some(s) = state.servers.iter_mut().find(|s| s.id == server.id) {
            s.status = ServerStatus::Off;
        }
        Ok(state.new_action(Operation::ShutdownServer))
    }

    async fn create_image(
        &self,
        server: &ServerRecord,
        description: &str,
        image_type: ImageType,
    ) -> Result<CreatedImage> {
        let mut state = self.state();
        state.record(Operation::CreateImage, server.name.clone())?;
        let image_id = state.next_id();
        state.images.push(ImageRecord {
            id: image_id,
            description: description.to_string(),
            size_bytes: None,
            created_at: Some(Utc::now().fixed_offset()),
            image_type,
        });
        let action = state.new_action(Operation::CreateImage);
        Ok(CreatedImage { image_id, action })
    }

    async fn delete_server(&self, server: &ServerRecord) -> Result<ActionHandle> {
        let mut state = self.state();
        state.record(Operation::DeleteServer, server.name.clone())?;
        state.servers.retain(|s| s.id != server.id);
        Ok(state.new_action(Operation::DeleteServer))
    }

    async fn delete_image(&self, image: &ImageRecord) -> Result<Option<ActionHandle>> {
        let mut state = self.state();
        state.record(Operation::DeleteImage, image.id.to_string())?;
        let before = state.images.len();
        state.images.retain(|i| i.id != image.id);
        if state.images.len() == before {
            return Err(CloudError::api("not_found", "image not found"));
        }
        Ok(None)
    }

    async fn get_action(&self, id: u64) -> Result<ActionHandle> {
        let mut state = self.state();
        state.record(Operation::GetAction, id.to_string())?;
        let script = state
            .actions
            .get_mut(&id)
            .ok_or_else(|| CloudError::ResourceNotFound(format!("action {}", id)))?;

        let mut handle = ActionHandle::running(id, "action");
        if let Script::Finish {
            remaining_polls,
            outcome,
        } = script
        {
            if *remaining_polls > 0 {
                *remaining_polls -= 1;
            } else {
                match outcome {
                    ActionOutcome::Succeeded => handle.status = ActionStatus::Success,
                    ActionOutcome::Failed(error) => {
                        handle.status = ActionStatus::Error;
                        handle.error = Some(error.clone());
                    }
                    ActionOutcome::TimedOut => {}
                }
            }
        }
        Ok(handle)
    }
}
