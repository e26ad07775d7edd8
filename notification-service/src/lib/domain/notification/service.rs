use std::sync::Arc;

use async_trait::async_trait;
use transport::events::PasswordResetEvent;
use transport::events::VerifyAccountEvent;
use transport::events::EMAIL_CHANNEL;

use crate::domain::notification::errors::NotificationError;
use crate::domain::notification::models::PasswordResetVariables;
use crate::domain::notification::models::VerifyAccountVariables;
use crate::domain::notification::ports::NotificationChannel;
use crate::domain::notification::ports::NotificationServicePort;

/// Renders links for user events and routes them to the requested channel.
pub struct NotificationService<C>
where
    C: NotificationChannel,
{
    org_name: String,
    website_base_url: String,
    email_channel: Arc<C>,
}

impl<C> NotificationService<C>
where
    C: NotificationChannel,
{
    pub fn new(
        org_name: impl Into<String>,
        website_base_url: impl Into<String>,
        email_channel: Arc<C>,
    ) -> Self {
        Self {
            org_name: org_name.into(),
            website_base_url: website_base_url.into().trim_end_matches('/').to_string(),
            email_channel,
        }
    }

    fn link(&self, path: &str, token: &str) -> String {
        format!("{}/{}?token={}", self.website_base_url, path, token)
    }
}

#[async_trait]
impl<C> NotificationServicePort for NotificationService<C>
where
    C: NotificationChannel,
{
    async fn password_reset(&self, event: &PasswordResetEvent) -> Result<(), NotificationError> {
        let variables = PasswordResetVariables {
            first_name: event.first_name.clone(),
            last_name: event.last_name.clone(),
            reset_link: self.link("reset-password", &event.token),
            app_name: self.org_name.clone(),
        };

        match event.channel.as_str() {
            EMAIL_CHANNEL => {
                self.email_channel
                    .send_password_reset(&event.recipient, &variables)
                    .await?
            }
            other => return Err(NotificationError::UnsupportedChannel(other.to_string())),
        }

        tracing::info!(channel = %event.channel, "Password reset notification sent");
        Ok(())
    }

    async fn verify_account(&self, event: &VerifyAccountEvent) -> Result<(), NotificationError> {
        let variables = VerifyAccountVariables {
            first_name: event.first_name.clone(),
            last_name: event.last_name.clone(),
            verify_link: self.link("verify-account", &event.token),
            app_name: self.org_name.clone(),
        };

        match event.channel.as_str() {
            EMAIL_CHANNEL => {
                self.email_channel
                    .send_verify_account(&event.recipient, &variables)
                    .await?
            }
            other => return Err(NotificationError::UnsupportedChannel(other.to_string())),
        }

        tracing::info!(channel = %event.channel, "Account verification notification sent");
        Ok(())
    }
}
