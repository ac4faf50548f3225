//! Local console transport: stdin lines in, stdout replies out

use crate::dispatch::Dispatcher;
use async_trait::async_trait;
use cloudbot_core::ReplySink;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Writes each reply to stdout as one block
pub struct ConsoleSink {
    out: Mutex<Stdout>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

fn paint(text: &str) -> String {
    if text.starts_with("Error") {
        text.red().to_string()
    } else if text.starts_with("Warning") {
        text.yellow().to_string()
    } else {
        text.to_string()
    }
}

#[async_trait]
impl ReplySink for ConsoleSink {
    async fn reply(&self, text: &str) -> anyhow::Result<()> {
        let mut out = self.out.lock().await;
        out.write_all(paint(text).as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

/// Read commands until stdin closes or Ctrl-C, then wait for running ones
pub async fn serve(dispatcher: &Dispatcher) -> anyhow::Result<()> {
    eprintln!(
        "{} {}",
        format!("cloudbot {}", env!("CARGO_PKG_VERSION")).cyan().bold(),
        "ready. Type `help` for commands".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut running: Vec<JoinHandle<()>> = Vec::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                running.retain(|handle| !handle.is_finished());
                running.push(dispatcher.dispatch(&line));
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, no new commands accepted");
                break;
            }
        }
    }

    if !running.is_empty() {
        tracing::info!("Waiting for {} running command(s)", running.len());
    }
    for handle in running {
        if let Err(e) = handle.await {
            tracing::error!("Command task failed: {}", e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(paint("Error: boom"), "Error: boom");
        assert_eq!(paint("All done"), "All done");
    }

    #[tokio::test]
    async fn test_default_sink_replies() {
        let sink = ConsoleSink::default();
        sink.reply("Fetching status..").await.unwrap();
    }
}
