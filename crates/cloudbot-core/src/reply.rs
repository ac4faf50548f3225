//! Operator reply channel

use async_trait::async_trait;

/// Where workflow progress and results are sent
///
/// The chat transport implements this; workflows only ever append text.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn reply(&self, text: &str) -> anyhow::Result<()>;
}

/// Send a progress message. A failed delivery is logged and does not stop
/// the workflow.
pub(crate) async fn notify(sink: &dyn ReplySink, text: &str) {
    if let Err(e) = sink.reply(text).await {
        tracing::warn!("Failed to deliver reply: {:#}", e);
    }
}
