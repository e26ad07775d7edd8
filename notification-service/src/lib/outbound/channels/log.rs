use async_trait::async_trait;

use crate::domain::notification::errors::ChannelError;
use crate::domain::notification::models::PasswordResetVariables;
use crate::domain::notification::models::VerifyAccountVariables;
use crate::domain::notification::ports::NotificationChannel;

/// Plain text notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotification {
    pub subject: String,
    pub body: String,
}

pub fn render_password_reset(variables: &PasswordResetVariables) -> RenderedNotification {
    RenderedNotification {
        subject: format!("{}: reset your password", variables.app_name),
        body: format!(
            "Hello {} {},\n\n\
             we received a request to reset your password. Open the link below to choose a new one:\n\n\
             {}\n\n\
             If you did not ask for this, you can ignore this message.\n\n\
             {}",
            variables.first_name, variables.last_name, variables.reset_link, variables.app_name
        ),
    }
}

pub fn render_verify_account(variables: &VerifyAccountVariables) -> RenderedNotification {
    RenderedNotification {
        subject: format!("{}: confirm your email address", variables.app_name),
        body: format!(
            "Hello {} {},\n\n\
             welcome to {}! Open the link below to activate your account:\n\n\
             {}\n\n\
             {}",
            variables.first_name,
            variables.last_name,
            variables.app_name,
            variables.verify_link,
            variables.app_name
        ),
    }
}

/// Email channel that writes rendered messages to the log instead of
/// handing them to a mail server.
#[derive(Debug, Clone, Default)]
pub struct LogChannel;

impl LogChannel {
    pub fn new() -> Self {
        Self
    }

    fn deliver(&self, recipient: &str, notification: RenderedNotification) {
        tracing::info!(recipient, subject = %notification.subject, "Email notification");
        // Body carries a single-use token
        tracing::debug!(recipient, body = %notification.body, "Email notification body");
    }
}

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send_password_reset(
        &self,
        recipient: &str,
        variables: &PasswordResetVariables,
    ) -> Result<(), ChannelError> {
        self.deliver(recipient, render_password_reset(variables));
        Ok(())
    }

    async fn send_verify_account(
        &self,
        recipient: &str,
        variables: &VerifyAccountVariables,
    ) -> Result<(), ChannelError> {
        self.deliver(recipient, render_verify_account(variables));
        Ok(())
    }
}
