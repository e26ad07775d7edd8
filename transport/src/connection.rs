use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::errors::TransportError;
use crate::ports::Connection;

/// [`Connection`] backed by a spawned polling task.
///
/// Dropping the handle also stops the task.
pub struct TaskConnection {
    topic: String,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TaskConnection {
    pub fn new(topic: impl Into<String>, cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            topic: topic.into(),
            cancel,
            task: Mutex::new(Some(task)),
        }
    }
}

#[async_trait]
impl Connection for TaskConnection {
    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(task) = self.task.lock().await.take() else {
            return Ok(());
        };

        self.cancel.cancel();
        if let Err(e) = task.await {
            tracing::warn!(topic = %self.topic, error = %e, "Consumer task ended abnormally");
        }

        tracing::info!(topic = %self.topic, "Consumer disconnected");
        Ok(())
    }
}

impl Drop for TaskConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
