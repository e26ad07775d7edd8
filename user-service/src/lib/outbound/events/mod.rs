pub mod publisher;

pub use publisher::TransportEventPublisher;
