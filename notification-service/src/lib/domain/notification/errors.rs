use thiserror::Error;

/// Failure reported by a delivery channel
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("unsupported channel {0}")]
    UnsupportedChannel(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
