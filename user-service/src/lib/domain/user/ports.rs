use async_trait::async_trait;
use transport::events::PasswordResetEvent;
use transport::events::VerifyAccountEvent;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Page;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::UpdateCurrentUserCommand;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::EventPublisherError;
use crate::user::errors::UserError;

/// Port for user domain service operations.
#[async_trait]
pub trait UserServicePort: Send + Sync + 'static {
    /// Register a pending account and send the verification notification.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `EventPublishing` - Verification event could not be published
    async fn register_user(&self, command: RegisterUserCommand) -> Result<User, UserError>;

    /// Activate the account named by an account verification token.
    ///
    /// Verifying an already active account succeeds.
    ///
    /// # Errors
    /// * `InvalidToken` - Token invalid, expired, of another kind, or for an unknown user
    async fn verify_account(&self, token: &str) -> Result<User, UserError>;

    /// # Errors
    /// * `NotFound` - User does not exist
    async fn get_user(&self, id: &UserId) -> Result<User, UserError>;

    async fn list_users(&self, page: Page) -> Result<Vec<User>, UserError>;

    /// Apply an admin edit to any account.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `EmailAlreadyExists` - Another user owns the new email
    async fn update_user(
        &self,
        id: &UserId,
        command: UpdateUserCommand,
    ) -> Result<User, UserError>;

    /// Apply the caller's own edit once their current password checks out.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `IncorrectPassword` - `current_password` does not match
    /// * `EmailAlreadyExists` - Another user owns the new email
    async fn update_current_user(
        &self,
        id: &UserId,
        command: UpdateCurrentUserCommand,
    ) -> Result<User, UserError>;

    /// # Errors
    /// * `NotFound` - User does not exist
    async fn delete_user(&self, id: &UserId) -> Result<(), UserError>;
}

/// Persistence port for users.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// # Errors
    /// * `EmailAlreadyExists` - Another user owns the email
    async fn create(&self, user: User) -> Result<User, UserError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;

    /// Users ordered by creation time.
    async fn list(&self, page: Page) -> Result<Vec<User>, UserError>;

    /// # Errors
    /// * `NotFound` - User does not exist
    async fn update(&self, user: User) -> Result<User, UserError>;

    /// # Errors
    /// * `NotFound` - User does not exist
    async fn delete(&self, id: &UserId) -> Result<(), UserError>;
}

/// Outbound port for notification events.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn publish_password_reset(
        &self,
        event: &PasswordResetEvent,
    ) -> Result<(), EventPublisherError>;

    async fn publish_verify_account(
        &self,
        event: &VerifyAccountEvent,
    ) -> Result<(), EventPublisherError>;
}
