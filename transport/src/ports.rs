use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::message::Message;
use crate::trace::TraceContext;

/// Publishes envelopes to a topic.
#[async_trait]
pub trait Producer: Send + Sync + 'static {
    /// Publish `message` to `topic` as a child span of `cx`.
    ///
    /// Returns once the broker has acknowledged the record. The first call
    /// establishes the broker connection.
    async fn produce(
        &self,
        cx: &TraceContext,
        topic: &str,
        message: &Message,
    ) -> Result<(), TransportError>;

    /// Same as [`Producer::produce`] but gives up after `deadline`.
    ///
    /// A timed out publish may still be delivered by the broker later.
    async fn produce_within(
        &self,
        deadline: Duration,
        cx: &TraceContext,
        topic: &str,
        message: &Message,
    ) -> Result<(), TransportError> {
        tokio::time::timeout(deadline, self.produce(cx, topic, message))
            .await
            .map_err(|_| TransportError::Timeout {
                topic: topic.to_string(),
                timeout: deadline,
            })?
    }
}

/// Receives envelopes delivered on a topic.
///
/// Invoked once per record. The transport has already logged and skipped
/// records that could not be decoded, so handlers only see valid envelopes.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, cx: &TraceContext, message: Message);
}

/// Subscribes handlers to topics.
#[async_trait]
pub trait Consumer: Send + Sync + 'static {
    /// Start delivering records from `topic` to `handler` in the background.
    ///
    /// Members of the same consumer group share the topic's records;
    /// separate groups each receive every record.
    async fn consume(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn Connection>, TransportError>;
}

/// Handle to a running subscription.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Stop delivery and wait for the in-flight handler call to finish.
    ///
    /// Calling it again is a no-op.
    async fn disconnect(&self) -> Result<(), TransportError>;
}

struct HandlerFn<F>(F);

#[async_trait]
impl<F, Fut> MessageHandler for HandlerFn<F>
where
    F: Fn(TraceContext, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, cx: &TraceContext, message: Message) {
        (self.0)(cx.clone(), message).await
    }
}

/// Adapt an async closure into a [`MessageHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(TraceContext, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(HandlerFn(f))
}
