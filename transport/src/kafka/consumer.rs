use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use rand::Rng;
use rdkafka::consumer::Consumer as _;
use rdkafka::consumer::StreamConsumer;
use rdkafka::message::Headers;
use rdkafka::message::OwnedMessage;
use rdkafka::ClientConfig;
use rdkafka::Message as _;
use tokio_util::sync::CancellationToken;

use super::KafkaConfig;
use super::SYSTEM;
use crate::connection::TaskConnection;
use crate::dispatch::dispatch;
use crate::dispatch::Delivery;
use crate::errors::TransportError;
use crate::ports::Connection;
use crate::ports::Consumer;
use crate::ports::MessageHandler;
use crate::trace::Tracer;

const CLIENT_SUFFIX_LEN: usize = 5;
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Kafka consumer; each [`Consumer::consume`] call joins the configured
/// group with its own client.
pub struct KafkaConsumer {
    config: KafkaConfig,
    tracer: Tracer,
}

impl KafkaConsumer {
    pub fn new(config: KafkaConfig, tracer: Tracer) -> Self {
        Self { config, tracer }
    }

    fn group(&self) -> &str {
        self.config
            .group_id
            .as_deref()
            .unwrap_or_else(|| self.tracer.service_name())
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    async fn consume(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let group = self.group();
        let client_id = client_id(group);

        tracing::info!(
            "Subscribing {} (group {}) to topic '{}' on {}",
            client_id,
            group,
            topic,
            self.config.brokers
        );

        let consumer: StreamConsumer = client_config(&self.config, group, &client_id)
            .create()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| TransportError::Subscription {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll(
            consumer,
            topic.to_string(),
            client_id,
            self.tracer.clone(),
            handler,
            cancel.clone(),
        ));

        Ok(Box::new(TaskConnection::new(topic, cancel, task)))
    }
}

/// Offsets are stored by the poll loop once the handler has returned and
/// committed in the background, so a record whose handler never finished is
/// delivered again to the group.
fn client_config(config: &KafkaConfig, group: &str, client_id: &str) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.brokers)
        .set("group.id", group)
        .set("client.id", client_id)
        .set("enable.auto.commit", "true")
        .set("enable.auto.offset.store", "false")
        .set("auto.commit.interval.ms", "5000")
        .set("auto.offset.reset", "earliest")
        .set("allow.auto.create.topics", "true")
        .set("session.timeout.ms", "30000")
        .set("enable.partition.eof", "false")
        .set(
            "socket.connection.setup.timeout.ms",
            (config.connect_timeout_secs * 1000).to_string(),
        );
    client
}

async fn poll(
    consumer: StreamConsumer,
    topic: String,
    client_id: String,
    tracer: Tracer,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
) {
    let mut stream = consumer.stream();

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = stream.next() => received,
        };

        let record = match received {
            Some(Ok(record)) => record,
            Some(Err(e)) => {
                tracing::error!(topic = %topic, error = %e, "Error fetching from Kafka");
                tokio::time::sleep(ERROR_BACKOFF).await;
                continue;
            }
            None => break,
        };

        let owned = record.detach();
        dispatch(
            &tracer,
            handler.as_ref(),
            Delivery {
                system: SYSTEM,
                topic: &topic,
                consumer_id: &client_id,
                headers: record_headers(&owned),
                payload: owned.payload().unwrap_or_default(),
            },
        )
        .await;

        if let Err(e) = consumer.store_offset_from_message(&record) {
            tracing::warn!(
                topic = %topic,
                partition = record.partition(),
                offset = record.offset(),
                error = %e,
                "Failed to store consumer offset"
            );
        }
    }

    tracing::info!(topic = %topic, client_id = %client_id, "Kafka consumer loop ended");
}

fn record_headers(record: &OwnedMessage) -> HashMap<String, String> {
    let Some(headers) = record.headers() else {
        return HashMap::new();
    };

    headers
        .iter()
        .filter_map(|header| {
            let value = header.value?;
            Some((
                header.key.to_string(),
                String::from_utf8_lossy(value).into_owned(),
            ))
        })
        .collect()
}

/// `<group>-<five random letters>`, unique per subscription.
fn client_id(group: &str) -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

    let mut rng = rand::thread_rng();
    let suffix: String = (0..CLIENT_SUFFIX_LEN)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect();

    format!("{group}-{suffix}")
}
