//! Kafka transport
//!
//! Delivery is at-least-once: the poll loop stores a record's offset only
//! after its handler returns, and stored offsets are committed in the
//! background. A crash mid-handler replays the record.

mod consumer;
mod producer;

use serde::Deserialize;

pub use consumer::KafkaConsumer;
pub use producer::KafkaProducer;

pub(crate) const SYSTEM: &str = "kafka";

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    /// Comma separated `host:port` list
    pub brokers: String,

    /// Consumer group; consumers fall back to their service name
    #[serde(default)]
    pub group_id: Option<String>,

    /// Upper bound on establishing the first broker connection
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// How long the client keeps retrying one publish before failing it
    #[serde(default = "default_message_timeout_secs")]
    pub message_timeout_secs: u64,
}

impl KafkaConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            group_id: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            message_timeout_secs: default_message_timeout_secs(),
        }
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_message_timeout_secs() -> u64 {
    5
}
