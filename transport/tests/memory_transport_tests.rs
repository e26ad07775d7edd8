use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use transport::handler_fn;
use transport::memory::InMemoryBroker;
use transport::Consumer;
use transport::Message;
use transport::MessageHandler;
use transport::Producer;
use transport::TraceContext;
use transport::Tracer;

const WAIT: Duration = Duration::from_secs(2);

/// Forwards every delivery to a channel the test can await.
fn recorder() -> (
    Arc<dyn MessageHandler>,
    mpsc::UnboundedReceiver<(TraceContext, Message)>,
) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let handler = handler_fn(move |cx, message| {
        let sender = sender.clone();
        async move {
            let _ = sender.send((cx, message));
        }
    });
    (handler, receiver)
}

async fn next<T>(receiver: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, receiver.recv())
        .await
        .expect("Timed out waiting for delivery")
        .expect("Channel closed")
}

async fn assert_idle<T>(receiver: &mut mpsc::UnboundedReceiver<T>) {
    assert!(
        tokio::time::timeout(Duration::from_millis(100), receiver.recv())
            .await
            .is_err(),
        "Unexpected delivery"
    );
}

#[tokio::test]
async fn test_delivers_message_with_trace_parent() {
    let broker = InMemoryBroker::new();
    let producer = broker.producer(Tracer::new("user-service"));
    let consumer = broker.consumer("notification-service", Tracer::new("notification-service"));

    let (handler, mut deliveries) = recorder();
    let connection = consumer.consume("t", handler).await.unwrap();

    let root = Tracer::new("user-service").start_trace();
    producer
        .produce(&root, "t", &Message::new("m1", json!({"k": "v"})))
        .await
        .unwrap();

    let (cx, message) = next(&mut deliveries).await;
    assert_eq!(message.id, "m1");
    assert_eq!(message.data, json!({"k": "v"}));
    assert_eq!(cx.trace_id(), root.trace_id());

    // The consumer's parent is the producer's publish span, itself a child of root
    let parent = cx.parent().expect("Remote parent");
    assert!(parent.is_remote());
    assert_eq!(parent.trace_id(), root.trace_id());
    assert_ne!(parent.span_id(), root.span_id());

    connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_malformed_record_is_skipped() {
    let broker = InMemoryBroker::new();
    let producer = broker.producer(Tracer::new("producer"));
    let consumer = broker.consumer("g", Tracer::new("consumer"));

    let (handler, mut deliveries) = recorder();
    let connection = consumer.consume("t", handler).await.unwrap();

    broker.publish_raw("t", HashMap::new(), b"not json".to_vec());
    broker.publish_raw("t", HashMap::new(), br#"{"data":{}}"#.to_vec());

    let cx = Tracer::new("producer").start_trace();
    producer
        .produce(&cx, "t", &Message::new("m2", json!(null)))
        .await
        .unwrap();

    let (_, message) = next(&mut deliveries).await;
    assert_eq!(message.id, "m2");
    assert_idle(&mut deliveries).await;

    connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_record_without_trace_headers_starts_new_trace() {
    let broker = InMemoryBroker::new();
    let consumer = broker.consumer("g", Tracer::new("consumer"));

    let (handler, mut deliveries) = recorder();
    let _connection = consumer.consume("t", handler).await.unwrap();

    broker.publish_raw("t", HashMap::new(), br#"{"id":"m3"}"#.to_vec());

    let (cx, message) = next(&mut deliveries).await;
    assert_eq!(message.id, "m3");
    assert!(cx.parent().is_none());
}

#[tokio::test]
async fn test_disconnect_is_idempotent_and_stops_delivery() {
    let broker = InMemoryBroker::new();
    let producer = broker.producer(Tracer::new("producer"));
    let consumer = broker.consumer("g", Tracer::new("consumer"));

    let (handler, mut deliveries) = recorder();
    let connection = consumer.consume("t", handler).await.unwrap();

    connection.disconnect().await.unwrap();
    connection.disconnect().await.unwrap();

    let cx = Tracer::new("producer").start_trace();
    producer
        .produce(&cx, "t", &Message::new("late", json!(null)))
        .await
        .unwrap();

    assert_idle(&mut deliveries).await;
}

#[tokio::test]
async fn test_groups_fan_out_and_members_share() {
    let broker = InMemoryBroker::new();
    let producer = broker.producer(Tracer::new("producer"));

    let (email_a, mut email_a_rx) = recorder();
    let (email_b, mut email_b_rx) = recorder();
    let (audit, mut audit_rx) = recorder();

    let _a = broker
        .consumer("email", Tracer::new("email"))
        .consume("t", email_a)
        .await
        .unwrap();
    let _b = broker
        .consumer("email", Tracer::new("email"))
        .consume("t", email_b)
        .await
        .unwrap();
    let _audit = broker
        .consumer("audit", Tracer::new("audit"))
        .consume("t", audit)
        .await
        .unwrap();

    let cx = Tracer::new("producer").start_trace();
    for id in ["m1", "m2"] {
        producer
            .produce(&cx, "t", &Message::new(id, json!(null)))
            .await
            .unwrap();
    }

    // Each member of the email group gets one of the two records
    let first = next(&mut email_a_rx).await.1.id;
    let second = next(&mut email_b_rx).await.1.id;
    assert_ne!(first, second);
    assert_idle(&mut email_a_rx).await;
    assert_idle(&mut email_b_rx).await;

    // The audit group sees both, in publish order
    assert_eq!(next(&mut audit_rx).await.1.id, "m1");
    assert_eq!(next(&mut audit_rx).await.1.id, "m2");
}

#[tokio::test]
async fn test_topics_are_isolated() {
    let broker = InMemoryBroker::new();
    let producer = broker.producer(Tracer::new("producer"));

    let (handler, mut deliveries) = recorder();
    let _connection = broker
        .consumer("g", Tracer::new("consumer"))
        .consume("password-reset", handler)
        .await
        .unwrap();

    let cx = Tracer::new("producer").start_trace();
    producer
        .produce(&cx, "verify-account", &Message::new("other", json!(null)))
        .await
        .unwrap();

    assert_idle(&mut deliveries).await;
}

struct SlowHandler {
    done: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl MessageHandler for SlowHandler {
    async fn handle(&self, _cx: &TraceContext, message: Message) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = self.done.send(message.id);
    }
}

#[tokio::test]
async fn test_disconnect_waits_for_in_flight_handler() {
    let broker = InMemoryBroker::new();
    let producer = broker.producer(Tracer::new("producer"));
    let (done, mut done_rx) = mpsc::unbounded_channel();

    let connection = broker
        .consumer("g", Tracer::new("consumer"))
        .consume("t", Arc::new(SlowHandler { done }))
        .await
        .unwrap();

    let cx = Tracer::new("producer").start_trace();
    producer
        .produce(&cx, "t", &Message::new("slow", json!(null)))
        .await
        .unwrap();

    // Let the loop pick the record up before stopping it
    tokio::time::sleep(Duration::from_millis(10)).await;
    connection.disconnect().await.unwrap();

    assert_eq!(done_rx.try_recv().ok().as_deref(), Some("slow"));
}

#[tokio::test]
async fn test_produce_within_reports_timeout() {
    struct StuckProducer;

    #[async_trait]
    impl Producer for StuckProducer {
        async fn produce(
            &self,
            _cx: &TraceContext,
            _topic: &str,
            _message: &Message,
        ) -> Result<(), transport::TransportError> {
            std::future::pending().await
        }
    }

    let cx = Tracer::new("producer").start_trace();
    let err = StuckProducer
        .produce_within(
            Duration::from_millis(20),
            &cx,
            "t",
            &Message::new("m", json!(null)),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
}
