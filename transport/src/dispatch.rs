use std::collections::HashMap;

use tracing::Instrument;

use crate::message::Message;
use crate::ports::MessageHandler;
use crate::trace::Tracer;

/// One record as fetched from a broker, before decoding.
pub(crate) struct Delivery<'a> {
    pub system: &'static str,
    pub topic: &'a str,
    pub consumer_id: &'a str,
    pub headers: HashMap<String, String>,
    pub payload: &'a [u8],
}

/// Decode a record and hand it to `handler` inside a receive span.
///
/// Records that are not valid envelopes are logged and skipped so one bad
/// record cannot stall the partition.
pub(crate) async fn dispatch(tracer: &Tracer, handler: &dyn MessageHandler, delivery: Delivery<'_>) {
    let cx = tracer.extract(&delivery.headers);
    let span = tracing::info_span!(
        "receive",
        otel.name = %format!("{} receive", delivery.topic),
        otel.kind = "consumer",
        otel.status_code = tracing::field::Empty,
        messaging.system = delivery.system,
        messaging.destination = delivery.topic,
        messaging.consumer_id = delivery.consumer_id,
        messaging.message.payload_size_bytes = delivery.payload.len(),
        messaging.message.id = tracing::field::Empty,
        trace_id = %cx.trace_id(),
        span_id = %cx.span_id(),
        parent_span_id = ?cx.parent().map(|p| p.span_id()),
    );

    let message = match Message::decode(delivery.payload) {
        Ok(message) => message,
        Err(e) => {
            span.record("otel.status_code", "ERROR");
            span.in_scope(|| {
                tracing::warn!(
                    topic = delivery.topic,
                    error = %e,
                    "Skipping record that is not a valid message"
                )
            });
            return;
        }
    };

    span.record("messaging.message.id", message.id.as_str());
    handler.handle(&cx, message).instrument(span).await;
}
