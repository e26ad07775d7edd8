use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connecting to broker: {0}")]
    Connection(String),

    #[error("subscribing to {topic}: {reason}")]
    Subscription { topic: String, reason: String },

    #[error("encoding message {id}: {reason}")]
    Encoding { id: String, reason: String },

    #[error("publishing to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("publishing to {topic} did not complete within {timeout:?}")]
    Timeout { topic: String, timeout: Duration },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}
