use std::collections::HashMap;

use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::SpanContext;
use opentelemetry::trace::SpanId;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::trace::TraceFlags;
use opentelemetry::trace::TraceId;
use opentelemetry::trace::TraceState;
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::IdGenerator;
use opentelemetry_sdk::trace::RandomIdGenerator;

/// Position of a unit of work inside a distributed trace.
///
/// Carries the span's own context plus the context of its parent, which
/// for a consumed record is the producer's span on the other side of the
/// broker.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceContext {
    span: SpanContext,
    parent: Option<SpanContext>,
}

impl TraceContext {
    pub fn trace_id(&self) -> TraceId {
        self.span.trace_id()
    }

    pub fn span_id(&self) -> SpanId {
        self.span.span_id()
    }

    pub fn span_context(&self) -> &SpanContext {
        &self.span
    }

    /// The parent span, if any.
    pub fn parent(&self) -> Option<&SpanContext> {
        self.parent.as_ref()
    }

    pub fn is_remote_child(&self) -> bool {
        self.parent.as_ref().is_some_and(SpanContext::is_remote)
    }
}

/// Creates spans for one service and moves their context across the broker
/// in W3C `traceparent`/`tracestate` headers.
#[derive(Debug, Clone)]
pub struct Tracer {
    service_name: String,
    ids: RandomIdGenerator,
}

impl Tracer {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ids: RandomIdGenerator::default(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Start a new trace.
    pub fn start_trace(&self) -> TraceContext {
        TraceContext {
            span: SpanContext::new(
                self.ids.new_trace_id(),
                self.ids.new_span_id(),
                TraceFlags::SAMPLED,
                false,
                TraceState::default(),
            ),
            parent: None,
        }
    }

    /// Start a span as a child of `parent`.
    pub fn start_span(&self, parent: &TraceContext) -> TraceContext {
        self.child_of(parent.span.clone())
    }

    /// Serialize `cx` into carrier headers.
    pub fn inject(&self, cx: &TraceContext) -> HashMap<String, String> {
        let context = Context::new().with_remote_span_context(cx.span.clone());
        let mut headers = HashMap::new();
        TraceContextPropagator::new().inject_context(&context, &mut headers);
        headers
    }

    /// Start a span continuing the trace found in `headers`.
    ///
    /// Missing or malformed headers start a new trace instead.
    pub fn extract(&self, headers: &HashMap<String, String>) -> TraceContext {
        let context = TraceContextPropagator::new().extract(headers);
        let remote = context.span().span_context().clone();

        if remote.is_valid() {
            self.child_of(remote)
        } else {
            self.start_trace()
        }
    }

    fn child_of(&self, parent: SpanContext) -> TraceContext {
        TraceContext {
            span: SpanContext::new(
                parent.trace_id(),
                self.ids.new_span_id(),
                parent.trace_flags(),
                false,
                parent.trace_state().clone(),
            ),
            parent: Some(parent),
        }
    }
}
