use async_trait::async_trait;
use transport::events::PasswordResetEvent;
use transport::events::VerifyAccountEvent;

use crate::domain::notification::errors::ChannelError;
use crate::domain::notification::errors::NotificationError;
use crate::domain::notification::models::PasswordResetVariables;
use crate::domain::notification::models::VerifyAccountVariables;

/// Turns user events into notifications.
#[async_trait]
pub trait NotificationServicePort: Send + Sync + 'static {
    /// # Errors
    /// * `UnsupportedChannel` - Event names a channel other than email
    /// * `Channel` - The channel could not deliver
    async fn password_reset(&self, event: &PasswordResetEvent) -> Result<(), NotificationError>;

    /// # Errors
    /// * `UnsupportedChannel` - Event names a channel other than email
    /// * `Channel` - The channel could not deliver
    async fn verify_account(&self, event: &VerifyAccountEvent) -> Result<(), NotificationError>;
}

/// Delivers rendered notifications to a recipient.
#[async_trait]
pub trait NotificationChannel: Send + Sync + 'static {
    async fn send_password_reset(
        &self,
        recipient: &str,
        variables: &PasswordResetVariables,
    ) -> Result<(), ChannelError>;

    async fn send_verify_account(
        &self,
        recipient: &str,
        variables: &VerifyAccountVariables,
    ) -> Result<(), ChannelError>;
}
