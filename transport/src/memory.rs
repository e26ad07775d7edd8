//! In-process broker
//!
//! Mirrors the Kafka delivery model closely enough for tests and local runs:
//! every consumer group receives each record, members of one group share
//! records round-robin, and each member sees its records in publish order.
//! Nothing is retained; records published to a group with no live member
//! are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::connection::TaskConnection;
use crate::dispatch::dispatch;
use crate::dispatch::Delivery;
use crate::errors::TransportError;
use crate::message::Message;
use crate::ports::Connection;
use crate::ports::Consumer;
use crate::ports::MessageHandler;
use crate::ports::Producer;
use crate::trace::TraceContext;
use crate::trace::Tracer;

const SYSTEM: &str = "memory";

#[derive(Debug, Clone)]
struct Record {
    headers: HashMap<String, String>,
    payload: Vec<u8>,
}

#[derive(Default)]
struct Group {
    members: Vec<mpsc::UnboundedSender<Record>>,
    next: usize,
}

#[derive(Default)]
struct Topic {
    groups: HashMap<String, Group>,
}

/// Shared broker; clones refer to the same topics.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    topics: Arc<Mutex<HashMap<String, Topic>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish raw bytes, bypassing envelope encoding.
    pub fn publish_raw(&self, topic: &str, headers: HashMap<String, String>, payload: Vec<u8>) {
        let record = Record { headers, payload };
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(topic) = topics.get_mut(topic) else {
            return;
        };

        for group in topic.groups.values_mut() {
            group.members.retain(|member| !member.is_closed());
            if group.members.is_empty() {
                continue;
            }

            let index = group.next % group.members.len();
            group.next = group.next.wrapping_add(1);
            // A member that hung up since the retain just misses the record
            let _ = group.members[index].send(record.clone());
        }
    }

    fn subscribe(&self, topic: &str, group: &str) -> mpsc::UnboundedReceiver<Record> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_string())
            .or_default()
            .groups
            .entry(group.to_string())
            .or_default()
            .members
            .push(sender);
        receiver
    }

    pub fn producer(&self, tracer: Tracer) -> InMemoryProducer {
        InMemoryProducer {
            broker: self.clone(),
            tracer,
        }
    }

    pub fn consumer(&self, group: impl Into<String>, tracer: Tracer) -> InMemoryConsumer {
        InMemoryConsumer {
            broker: self.clone(),
            group: group.into(),
            tracer,
        }
    }
}

pub struct InMemoryProducer {
    broker: InMemoryBroker,
    tracer: Tracer,
}

#[async_trait]
impl Producer for InMemoryProducer {
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
            messaging.system = SYSTEM,
            messaging.destination = topic,
            messaging.message.id = %message.id,
            trace_id = %span_cx.trace_id(),
            span_id = %span_cx.span_id(),
        );

        async {
            self.broker
                .publish_raw(topic, self.tracer.inject(&span_cx), payload);
            tracing::debug!("Message published");
        }
        .instrument(span)
        .await;

        Ok(())
    }
}

pub struct InMemoryConsumer {
    broker: InMemoryBroker,
    group: String,
    tracer: Tracer,
}

#[async_trait]
impl Consumer for InMemoryConsumer {
    async fn consume(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let mut receiver = self.broker.subscribe(topic, &self.group);
        let cancel = CancellationToken::new();

        let tracer = self.tracer.clone();
        let group = self.group.clone();
        let topic_name = topic.to_string();
        let stop = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                let record = tokio::select! {
                    _ = stop.cancelled() => break,
                    record = receiver.recv() => match record {
                        Some(record) => record,
                        None => break,
                    },
                };

                dispatch(
                    &tracer,
                    handler.as_ref(),
                    Delivery {
                        system: SYSTEM,
                        topic: &topic_name,
                        consumer_id: &group,
                        headers: record.headers,
                        payload: &record.payload,
                    },
                )
                .await;
            }
        });

        Ok(Box::new(TaskConnection::new(topic, cancel, task)))
    }
}
