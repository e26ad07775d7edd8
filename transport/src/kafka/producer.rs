use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::message::Header;
use rdkafka::message::OwnedHeaders;
use rdkafka::producer::FutureProducer;
use rdkafka::producer::FutureRecord;
use rdkafka::util::Timeout;
use tokio::sync::OnceCell;
use tracing::Instrument;

use super::KafkaConfig;
use super::SYSTEM;
use crate::errors::TransportError;
use crate::message::Message;
use crate::ports::Producer;
use crate::trace::TraceContext;
use crate::trace::Tracer;

/// Kafka producer that connects on first publish.
///
/// Concurrent first publishes share a single connection attempt; a failed
/// attempt is retried by the next publish.
pub struct KafkaProducer {
    config: KafkaConfig,
    tracer: Tracer,
    producer: OnceCell<FutureProducer>,
}

impl KafkaProducer {
    pub fn new(config: KafkaConfig, tracer: Tracer) -> Self {
        Self {
            config,
            tracer,
            producer: OnceCell::new(),
        }
    }

    async fn connection(&self) -> Result<&FutureProducer, TransportError> {
        self.producer
            .get_or_try_init(|| async {
                tracing::info!(brokers = %self.config.brokers, "Connecting Kafka producer");

                let producer: FutureProducer = ClientConfig::new()
                    .set("bootstrap.servers", &self.config.brokers)
                    .set("client.id", self.tracer.service_name())
                    .set("acks", "all")
                    .set("enable.idempotence", "true")
                    .set("max.in.flight.requests.per.connection", "5")
                    .set("retry.backoff.ms", "100")
                    .set("compression.type", "gzip")
                    .set(
                        "socket.connection.setup.timeout.ms",
                        (self.config.connect_timeout_secs * 1000).to_string(),
                    )
                    .set(
                        "message.timeout.ms",
                        (self.config.message_timeout_secs * 1000).to_string(),
                    )
                    .create()
                    .map_err(|e| TransportError::Connection(e.to_string()))?;

                Ok::<_, TransportError>(producer)
            })
            .await
    }
}

#[async_trait]
impl Producer for KafkaProducer {
    async fn produce(
        &self,
        cx: &TraceContext,
        topic: &str,
        message: &Message,
    ) -> Result<(), TransportError> {
        let payload = message.encode().map_err(|e| TransportError::Encoding {
            id: message.id.clone(),
            reason: e.to_string(),
        })?;

        let span_cx = self.tracer.start_span(cx);
        let span = tracing::info_span!(
            "produce",
            otel.name = %format!("{topic} produce"),
            otel.kind = "producer",
            otel.status_code = tracing::field::Empty,
            messaging.system = SYSTEM,
            messaging.destination = topic,
            messaging.message.id = %message.id,
            messaging.message.kind = ?message.kind,
            messaging.message.payload_size_bytes = payload.len(),
            trace_id = %span_cx.trace_id(),
            span_id = %span_cx.span_id(),
        );

        async {
            let producer = self.connection().await?;

            let headers = self
                .tracer
                .inject(&span_cx)
                .iter()
                .fold(OwnedHeaders::new(), |headers, (key, value)| {
                    headers.insert(Header {
                        key,
                        value: Some(value),
                    })
                });

            let record = FutureRecord::to(topic)
                .key(&message.id)
                .payload(&payload)
                .headers(headers);

            let timeout = Duration::from_secs(self.config.message_timeout_secs);
            match producer.send(record, Timeout::After(timeout)).await {
                Ok(delivery) => {
                    tracing::debug!(?delivery, "Message published");
                    Ok(())
                }
                Err((e, _)) => {
                    tracing::Span::current().record("otel.status_code", "ERROR");
                    tracing::error!(error = %e, "Failed to publish message");
                    Err(publish_error(topic, timeout, e))
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn publish_error(topic: &str, timeout: Duration, error: KafkaError) -> TransportError {
    match error {
        KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut) => {
            TransportError::Timeout {
                topic: topic.to_string(),
                timeout,
            }
        }
        e => TransportError::Publish {
            topic: topic.to_string(),
            reason: e.to_string(),
        },
    }
}
