//! Event transport shared by the blog services
//!
//! - [`Message`]: JSON envelope `{id, type?, data}` exchanged over the broker
//! - [`Producer`] / [`Consumer`] / [`Connection`] / [`MessageHandler`]: capability
//!   traits so services do not depend on a concrete broker
//! - [`kafka`]: rdkafka implementation (at-least-once, consumer groups)
//! - [`memory`]: in-process broker with the same semantics, for tests and local runs
//! - [`trace`]: W3C trace-context propagation through record headers
//! - [`events`]: payloads and topic names exchanged between services

pub mod config;
pub mod connection;
mod dispatch;
pub mod errors;
pub mod events;
pub mod kafka;
pub mod memory;
pub mod message;
pub mod ports;
pub mod trace;

pub use config::Transport;
pub use config::TransportConfig;
pub use errors::TransportError;
pub use message::Message;
pub use ports::handler_fn;
pub use ports::Connection;
pub use ports::Consumer;
pub use ports::MessageHandler;
pub use ports::Producer;
pub use trace::TraceContext;
pub use trace::Tracer;
