use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use transport::events::PasswordResetEvent;
use transport::events::VerifyAccountEvent;
use transport::events::PASSWORD_RESET_MESSAGE;
use transport::events::PASSWORD_RESET_TOPIC;
use transport::events::VERIFY_ACCOUNT_MESSAGE;
use transport::events::VERIFY_ACCOUNT_TOPIC;
use transport::Message;
use transport::Producer;
use transport::TransportError;
use transport::Tracer;

use crate::user::errors::EventPublisherError;
use crate::user::ports::EventPublisher;

impl From<TransportError> for EventPublisherError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Encoding { .. } => EventPublisherError::SerializationFailed(err.to_string()),
            TransportError::Timeout { .. } => EventPublisherError::Timeout(err.to_string()),
            _ => EventPublisherError::PublishFailed(err.to_string()),
        }
    }
}

/// Publishes notification events through the configured transport.
///
/// Every publish starts a new trace whose id is logged with the request.
pub struct TransportEventPublisher {
    producer: Arc<dyn Producer>,
    tracer: Tracer,
    timeout: Duration,
}

impl TransportEventPublisher {
    pub fn new(producer: Arc<dyn Producer>, tracer: Tracer, timeout: Duration) -> Self {
        Self {
            producer,
            tracer,
            timeout,
        }
    }

    async fn publish<T: Serialize + Sync>(
        &self,
        topic: &str,
        kind: &str,
        event: &T,
    ) -> Result<(), EventPublisherError> {
        let message = Message::from_payload(event)
            .map_err(|e| EventPublisherError::SerializationFailed(e.to_string()))?
            .with_kind(kind);

        let cx = self.tracer.start_trace();
        tracing::debug!(
            topic,
            message_id = %message.id,
            trace_id = %cx.trace_id(),
            "Publishing event"
        );

        self.producer
            .produce_within(self.timeout, &cx, topic, &message)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for TransportEventPublisher {
    async fn publish_password_reset(
        &self,
        event: &PasswordResetEvent,
    ) -> Result<(), EventPublisherError> {
        self.publish(PASSWORD_RESET_TOPIC, PASSWORD_RESET_MESSAGE, event)
            .await
    }

    async fn publish_verify_account(
        &self,
        event: &VerifyAccountEvent,
    ) -> Result<(), EventPublisherError> {
        self.publish(VERIFY_ACCOUNT_TOPIC, VERIFY_ACCOUNT_MESSAGE, event)
            .await
    }
}

#[cfg(test)]
mod tests {
    use transport::handler_fn;
    use transport::memory::InMemoryBroker;
    use transport::Consumer;

    use super::*;

    #[tokio::test]
    async fn test_publishes_typed_envelope() {
        let broker = InMemoryBroker::new();
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let _connection = broker
            .consumer("notification-service", Tracer::new("notification-service"))
            .consume(
                PASSWORD_RESET_TOPIC,
                handler_fn(move |_cx, message| {
                    let sender = sender.clone();
                    async move {
                        let _ = sender.send(message);
                    }
                }),
            )
            .await
            .unwrap();

        let publisher = TransportEventPublisher::new(
            Arc::new(broker.producer(Tracer::new("user-service"))),
            Tracer::new("user-service"),
            Duration::from_secs(1),
        );

        let event = PasswordResetEvent {
            recipient: "ada@example.com".to_string(),
            channel: "email".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            token: "t".to_string(),
        };
        publisher.publish_password_reset(&event).await.unwrap();

        let message = tokio::time::timeout(Duration::from_secs(2), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.kind.as_deref(), Some(PASSWORD_RESET_MESSAGE));
        assert_eq!(message.payload::<PasswordResetEvent>().unwrap(), event);
    }

    #[test]
    fn test_transport_error_mapping() {
        let timeout = TransportError::Timeout {
            topic: "t".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(matches!(
            EventPublisherError::from(timeout),
            EventPublisherError::Timeout(_)
        ));

        let publish = TransportError::Publish {
            topic: "t".to_string(),
            reason: "down".to_string(),
        };
        assert!(matches!(
            EventPublisherError::from(publish),
            EventPublisherError::PublishFailed(_)
        ));
    }
}
