//! Chat command parsing and dispatch

use cloudbot_core::{Orchestrator, ReplySink, describe_outcome};
use futures_util::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

pub const HELP: &str = "\
Commands:
  status          show servers and snapshots
  start <server>  create <server> from its latest snapshot
  stop <server>   shut down, snapshot and delete <server>, then drop its old snapshot
  help            show this message";

/// One operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Start(String),
    Stop(String),
    Help,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}`")]
    Unknown(String),

    #[error("`{0}` needs a server name")]
    MissingArgument(&'static str),

    #[error("unexpected argument `{0}`")]
    UnexpectedArgument(String),
}

impl Command {
    /// Parse a chat line. The command word is case-insensitive; server
    /// names are kept as typed.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ParseError::Empty)?.to_lowercase();
        let command = match verb.as_str() {
            "status" => Command::Status,
            "help" => Command::Help,
            "start" => Command::Start(
                words
                    .next()
                    .ok_or(ParseError::MissingArgument("start"))?
                    .to_string(),
            ),
            "stop" => Command::Stop(
                words
                    .next()
                    .ok_or(ParseError::MissingArgument("stop"))?
                    .to_string(),
            ),
            _ => return Err(ParseError::Unknown(verb)),
        };
        match words.next() {
            Some(extra) => Err(ParseError::UnexpectedArgument(extra.to_string())),
            None => Ok(command),
        }
    }
}

/// Runs commands concurrently and relays their progress to the sink
#[derive(Clone)]
pub struct Dispatcher {
    orchestrator: Orchestrator,
    sink: Arc<dyn ReplySink>,
}

impl Dispatcher {
    pub fn new(orchestrator: Orchestrator, sink: Arc<dyn ReplySink>) -> Self {
        Self { orchestrator, sink }
    }

    /// Handle one chat line on its own task; never waits for the workflow
    pub fn dispatch(&self, line: &str) -> JoinHandle<()> {
        let dispatcher = self.clone();
        let line = line.to_string();
        tokio::spawn(async move {
            match Command::parse(&line) {
                Ok(command) => dispatcher.run(command).await,
                Err(ParseError::Empty) => {}
                Err(e) => {
                    tracing::debug!("Rejected command {:?}: {}", line, e);
                    dispatcher
                        .say(&format!("Error: {}. Type `help` for commands", e))
                        .await;
                }
            }
        })
    }

    /// Run a command to completion
    pub async fn run(&self, command: Command) {
        tracing::info!("Running {:?}", command);
        match command {
            Command::Help => self.say(HELP).await,
            Command::Status => self.status().await,
            Command::Start(server) => self.start(&server).await,
            Command::Stop(server) => self.stop(&server).await,
        }
    }

    async fn status(&self) {
        self.say("Fetching status..").await;
        match self.orchestrator.status().await {
            Ok(report) => self.say(&report.to_string()).await,
            Err(e) => self.fail("status", &e).await,
        }
    }

    async fn start(&self, server: &str) {
        match self.orchestrator.provision(server, self.sink.as_ref()).await {
            Ok(outcome) => self.say(&describe_outcome(&outcome)).await,
            Err(e) => self.fail(server, &e).await,
        }
    }

    async fn stop(&self, server: &str) {
        self.say(&format!("Stopping server: {}", server)).await;
        let mut run = match self.orchestrator.decommission(server).await {
            Ok(run) => run,
            Err(e) => return self.fail(server, &e).await,
        };
        while let Some(outcome) = run.next().await {
            self.say(&outcome.to_string()).await;
        }
    }

    async fn fail(&self, context: &str, err: &cloudbot_core::WorkflowError) {
        tracing::error!("{} failed: {}", context, err);
        self.say(&format!("Error: {}", err)).await;
    }

    async fn say(&self, text: &str) {
        if let Err(e) = self.sink.reply(text).await {
            tracing::warn!("Failed to deliver reply: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cloudbot_cloud::ServerStatus;
    use cloudbot_cloud::fake::{FakeProvider, Operation};
    use cloudbot_core::{StaticIdentityTable, WorkflowSettings};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        replies: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn replies(&self) -> Vec<String> {
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

    fn dispatcher(provider: Arc<FakeProvider>) -> (Dispatcher, Arc<RecordingSink>) {
        let identities = StaticIdentityTable::new().with_entry("nub", 48363362);
        let orchestrator =
            Orchestrator::new(provider, Arc::new(identities), WorkflowSettings::default());
        let sink = Arc::new(RecordingSink::default());
        (Dispatcher::new(orchestrator, sink.clone()), sink)
    }

    fn fleet() -> FakeProvider {
        FakeProvider::new()
            .with_server(1, "nub", ServerStatus::Running)
            .with_snapshot(149793636, "nub-02-16", Some("2024-02-16T10:00:00+00:00"))
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("status"), Ok(Command::Status));
        assert_eq!(Command::parse("  STATUS "), Ok(Command::Status));
        assert_eq!(Command::parse("Help"), Ok(Command::Help));
        assert_eq!(Command::parse("start nub"), Ok(Command::Start("nub".into())));
        assert_eq!(Command::parse("Stop nub"), Ok(Command::Stop("nub".into())));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Command::parse(""), Err(ParseError::Empty));
        assert_eq!(
            Command::parse("reboot nub"),
            Err(ParseError::Unknown("reboot".into()))
        );
        assert_eq!(
            Command::parse("start"),
            Err(ParseError::MissingArgument("start"))
        );
        assert_eq!(
            Command::parse("stop nub now"),
            Err(ParseError::UnexpectedArgument("now".into()))
        );
        assert_eq!(
            Command::parse("status nub"),
            Err(ParseError::UnexpectedArgument("nub".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_replies() {
        let (dispatcher, sink) = dispatcher(Arc::new(fleet()));
        dispatcher.dispatch("status").await.unwrap();

        let replies = sink.replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], "Fetching status..");
        assert!(replies[1].starts_with("```"));
        assert!(replies[1].contains("nub-02-16"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_replies() {
        let (dispatcher, sink) = dispatcher(Arc::new(fleet()));
        dispatcher.dispatch("start nub").await.unwrap();

        assert_eq!(
            sink.replies(),
            vec![
                "Creating server with: create_server".to_string(),
                "Server created successfully".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_unknown_image() {
        let (dispatcher, sink) = dispatcher(Arc::new(fleet()));
        dispatcher.dispatch("start ghost").await.unwrap();

        assert_eq!(
            sink.replies(),
            vec!["Error: could not find snapshot image for server `ghost`".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_relays_every_step() {
        let provider = Arc::new(fleet());
        provider.fail(Operation::ShutdownServer, "conflict", "conflict");
        let (dispatcher, sink) = dispatcher(provider);
        dispatcher.dispatch("stop nub").await.unwrap();

        let replies = sink.replies();
        assert_eq!(replies.len(), 5);
        assert_eq!(replies[0], "Stopping server: nub");
        assert!(replies[1].starts_with("Error shutting down server: conflict"));
        assert!(replies[2].starts_with("Server snapshotted as `nub-"));
        assert_eq!(replies[3], "Server killed. Now cleaning up image..");
        assert_eq!(replies[4], "Old image `149793636` deleted. All done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_unknown_server() {
        let (dispatcher, sink) = dispatcher(Arc::new(fleet()));
        dispatcher.dispatch("stop ghost").await.unwrap();

        assert_eq!(
            sink.replies(),
            vec![
                "Stopping server: ghost".to_string(),
                "Error: could not find server `ghost`".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_run_concurrently() {
        let provider = Arc::new(fleet());
        provider.never_finish(Operation::CreateServer);
        let (dispatcher, sink) = dispatcher(provider);

        let start = dispatcher.dispatch("start nub");
        dispatcher.dispatch("status").await.unwrap();
        assert!(sink.replies().contains(&"Fetching status..".to_string()));
        assert!(!start.is_finished());

        start.await.unwrap();
        assert_eq!(
            sink.replies().last().map(String::as_str),
            Some("Warning: got bored waiting for server creation, over to you")
        );
    }

    #[tokio::test]
    async fn test_unknown_command_reply() {
        let (dispatcher, sink) = dispatcher(Arc::new(fleet()));
        dispatcher.dispatch("reboot").await.unwrap();

        assert_eq!(
            sink.replies(),
            vec!["Error: unknown command `reboot`. Type `help` for commands".to_string()]
        );
    }
}
