use std::sync::Arc;

use async_trait::async_trait;
use auth::Clock;
use auth::SystemClock;
use auth::TokenSigner;
use auth::TokenVerifier;
use transport::events::VerifyAccountEvent;
use transport::events::EMAIL_CHANNEL;

use crate::domain::user::models::Page;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::UpdateCurrentUserCommand;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserRole;
use crate::domain::user::models::UserStatus;
use crate::user::errors::UserError;
use crate::user::ports::EventPublisher;
use crate::user::ports::UserRepository;
use crate::user::ports::UserServicePort;

/// Domain service implementation for account operations.
pub struct UserService<UR, EP>
where
    UR: UserRepository,
    EP: EventPublisher,
{
    repository: Arc<UR>,
    event_publisher: Arc<EP>,
    signer: Arc<dyn TokenSigner>,
    verifier: Arc<dyn TokenVerifier>,
    password_hasher: auth::PasswordHasher,
    clock: Arc<dyn Clock>,
}

impl<UR, EP> UserService<UR, EP>
where
    UR: UserRepository,
    EP: EventPublisher,
{
    pub fn new(
        repository: Arc<UR>,
        event_publisher: Arc<EP>,
        signer: Arc<dyn TokenSigner>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
            signer,
            verifier,
            password_hasher: auth::PasswordHasher::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Make sure an active admin account exists for `command.email`.
    ///
    /// An existing account is promoted and activated; its password is kept.
    pub async fn ensure_admin(&self, command: RegisterUserCommand) -> Result<User, UserError> {
        if let Some(mut user) = self.repository.find_by_email(&command.email).await? {
            if user.role == UserRole::Admin && user.is_active() {
                return Ok(user);
            }

            user.role = UserRole::Admin;
            user.status = UserStatus::Active;
            user.updated_at = self.clock.now();
            return self.repository.update(user).await;
        }

        let user = self
            .new_user(command, UserRole::Admin, UserStatus::Active)
            .await?;
        let user = self.repository.create(user).await?;

        tracing::info!(user_id = %user.id, "Admin account created");
        Ok(user)
    }

    async fn new_user(
        &self,
        command: RegisterUserCommand,
        role: UserRole,
        status: UserStatus,
    ) -> Result<User, UserError> {
        let password_hash = self
            .password_hasher
            .hash(command.password.expose())
            .map_err(|e| UserError::Hashing(e.to_string()))?;

        let now = self.clock.now();
        Ok(User {
            id: UserId::new(),
            email: command.email,
            first_name: command.first_name,
            last_name: command.last_name,
            password_hash,
            status,
            role,
            created_at: now,
            updated_at: now,
        })
    }
}

#[async_trait]
impl<UR, EP> UserServicePort for UserService<UR, EP>
where
    UR: UserRepository,
    EP: EventPublisher,
{
    async fn register_user(&self, command: RegisterUserCommand) -> Result<User, UserError> {
        if self
            .repository
            .find_by_email(&command.email)
            .await?
            .is_some()
        {
            return Err(UserError::EmailAlreadyExists(command.email.to_string()));
        }

        let user = self
            .new_user(command, UserRole::User, UserStatus::Pending)
            .await?;
        let user = self.repository.create(user).await?;

        let verification = self
            .signer
            .create_verify_account_token(&user.id.to_string())
            .map_err(|e| UserError::Signing(e.to_string()))?;

        let event = VerifyAccountEvent {
            recipient: user.email.to_string(),
            channel: EMAIL_CHANNEL.to_string(),
            first_name: user.first_name.as_str().to_string(),
            last_name: user.last_name.as_str().to_string(),
            token: verification.token,
        };

        if let Err(e) = self.event_publisher.publish_verify_account(&event).await {
            tracing::error!(
                "Failed to publish VerifyAccount event for user {}: {}",
                user.id,
                e
            );
            return Err(e.into());
        }

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn verify_account(&self, token: &str) -> Result<User, UserError> {
        let claims = self
            .verifier
            .validate_verify_account_token(token)
            .map_err(|e| {
                tracing::debug!(error = %e, "Account verification token rejected");
                UserError::InvalidToken
            })?;

        let user_id = UserId::from_string(&claims.sub).map_err(|_| UserError::InvalidToken)?;
        let mut user = self
            .repository
            .find_by_id(&user_id)
            .await?
            .ok_or(UserError::InvalidToken)?;

        if user.is_active() {
            return Ok(user);
        }

        user.status = UserStatus::Active;
        user.updated_at = self.clock.now();
        let user = self.repository.update(user).await?;

        tracing::info!(user_id = %user.id, "Account verified");
        Ok(user)
    }

    async fn get_user(&self, id: &UserId) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }

    async fn list_users(&self, page: Page) -> Result<Vec<User>, UserError> {
        self.repository.list(page).await
    }

    async fn update_user(
        &self,
        id: &UserId,
        command: UpdateUserCommand,
    ) -> Result<User, UserError> {
        let mut user = self.get_user(id).await?;

        if let Some(email) = command.email {
            user.email = email;
        }
        if let Some(first_name) = command.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = command.last_name {
            user.last_name = last_name;
        }
        if let Some(role) = command.role {
            user.role = role;
        }
        if let Some(status) = command.status {
            user.status = status;
        }
        user.updated_at = self.clock.now();

        let user = self.repository.update(user).await?;
        tracing::info!(
            user_id = %user.id,
            role = ?user.role,
            status = ?user.status,
            "User updated"
        );
        Ok(user)
    }

    async fn update_current_user(
        &self,
        id: &UserId,
        command: UpdateCurrentUserCommand,
    ) -> Result<User, UserError> {
        let mut user = self.get_user(id).await?;

        let matches = self
            .password_hasher
            .verify(&command.current_password, &user.password_hash)
            .map_err(|e| UserError::Hashing(e.to_string()))?;
        if !matches {
            tracing::debug!(user_id = %user.id, "Current password rejected");
            return Err(UserError::IncorrectPassword);
        }

        if let Some(email) = command.email {
            user.email = email;
        }
        if let Some(first_name) = command.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = command.last_name {
            user.last_name = last_name;
        }
        if let Some(password) = command.password {
            user.password_hash = self
                .password_hasher
                .hash(password.expose())
                .map_err(|e| UserError::Hashing(e.to_string()))?;
        }
        user.updated_at = self.clock.now();

        let user = self.repository.update(user).await?;
        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), UserError> {
        self.repository.delete(id).await?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}
