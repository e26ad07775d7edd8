use std::sync::Arc;

use serde::Deserialize;

use crate::kafka::KafkaConfig;
use crate::kafka::KafkaConsumer;
use crate::kafka::KafkaProducer;
use crate::memory::InMemoryBroker;
use crate::ports::Consumer;
use crate::ports::Producer;
use crate::trace::Tracer;

/// Broker selection as read from service configuration.
///
/// ```toml
/// [transport]
/// type = "kafka"
/// brokers = "localhost:9092"
/// group_id = "notification-service"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Kafka(KafkaConfig),
    /// Process-local broker; only reaches consumers in the same process
    Memory,
}

/// A configured broker that hands out producers and consumers.
#[derive(Clone)]
pub enum Transport {
    Kafka(KafkaConfig),
    Memory(InMemoryBroker),
}

impl Transport {
    pub fn from_config(config: &TransportConfig) -> Self {
        match config {
            TransportConfig::Kafka(kafka) => Transport::Kafka(kafka.clone()),
            TransportConfig::Memory => Transport::Memory(InMemoryBroker::new()),
        }
    }

    pub fn producer(&self, tracer: &Tracer) -> Arc<dyn Producer> {
        match self {
            Transport::Kafka(config) => Arc::new(KafkaProducer::new(config.clone(), tracer.clone())),
            Transport::Memory(broker) => Arc::new(broker.producer(tracer.clone())),
        }
    }

    /// Consumers without a configured group join one named after the
    /// tracer's service.
    pub fn consumer(&self, tracer: &Tracer) -> Arc<dyn Consumer> {
        match self {
            Transport::Kafka(config) => Arc::new(KafkaConsumer::new(config.clone(), tracer.clone())),
            Transport::Memory(broker) => {
                Arc::new(broker.consumer(tracer.service_name(), tracer.clone()))
            }
        }
    }
}
