use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::Span;
use transport::events::PasswordResetEvent;
use transport::events::VerifyAccountEvent;
use transport::Message;
use transport::MessageHandler;
use transport::TraceContext;

use crate::domain::notification::errors::NotificationError;
use crate::domain::notification::ports::NotificationServicePort;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("unmarshalling {id} request payload: {reason}")]
    Decode { id: String, reason: String },

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

fn decode<T: DeserializeOwned>(message: &Message) -> Result<T, HandlerError> {
    message.payload().map_err(|e| HandlerError::Decode {
        id: message.id.clone(),
        reason: e.to_string(),
    })
}

/// Record the outcome on the receive span and log failures.
///
/// Errors stop here so the consumer loop keeps polling.
fn report(event: &'static str, message_id: &str, result: Result<(), HandlerError>) {
    match result {
        Ok(()) => {
            Span::current().record("otel.status_code", "OK");
        }
        Err(e) => {
            Span::current().record("otel.status_code", "ERROR");
            tracing::error!(id = message_id, event, error = %e, "Unable to handle message");
        }
    }
}

/// Handles `PasswordResetEvent`s from the password-reset topic.
pub struct PasswordResetHandler<S: NotificationServicePort> {
    service: Arc<S>,
}

impl<S: NotificationServicePort> PasswordResetHandler<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    async fn handle_message(&self, message: &Message) -> Result<(), HandlerError> {
        let event: PasswordResetEvent = decode(message)?;
        self.service.password_reset(&event).await?;
        Ok(())
    }
}

#[async_trait]
impl<S: NotificationServicePort> MessageHandler for PasswordResetHandler<S> {
    async fn handle(&self, cx: &TraceContext, message: Message) {
        tracing::debug!(id = %message.id, trace_id = %cx.trace_id(), "Handling password reset");
        let result = self.handle_message(&message).await;
        report("PasswordResetEvent", &message.id, result);
    }
}

/// Handles `VerifyAccountEvent`s from the verify-account topic.
pub struct VerifyAccountHandler<S: NotificationServicePort> {
    service: Arc<S>,
}

impl<S: NotificationServicePort> VerifyAccountHandler<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    async fn handle_message(&self, message: &Message) -> Result<(), HandlerError> {
        let event: VerifyAccountEvent = decode(message)?;
        self.service.verify_account(&event).await?;
        Ok(())
    }
}

#[async_trait]
impl<S: NotificationServicePort> MessageHandler for VerifyAccountHandler<S> {
    async fn handle(&self, cx: &TraceContext, message: Message) {
        tracing::debug!(id = %message.id, trace_id = %cx.trace_id(), "Handling account verification");
        let result = self.handle_message(&message).await;
        report("VerifyAccountEvent", &message.id, result);
    }
}
