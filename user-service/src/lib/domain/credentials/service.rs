use std::sync::Arc;

use async_trait::async_trait;
use auth::Clock;
use auth::SystemClock;
use auth::TokenSigner;
use auth::TokenVerifier;
use transport::events::PasswordResetEvent;
use transport::events::EMAIL_CHANNEL;

use crate::domain::credentials::errors::CredentialsError;
use crate::domain::credentials::models::RefreshToken;
use crate::domain::credentials::models::RevokeOutcome;
use crate::domain::credentials::models::TokenPair;
use crate::domain::credentials::ports::CredentialsServicePort;
use crate::domain::credentials::ports::TokenStore;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Password;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::ports::EventPublisher;
use crate::user::ports::UserRepository;

/// Login, refresh rotation, logout and password reset.
pub struct CredentialsService<UR, TS, EP>
where
    UR: UserRepository,
    TS: TokenStore,
    EP: EventPublisher,
{
    repository: Arc<UR>,
    token_store: Arc<TS>,
    event_publisher: Arc<EP>,
    signer: Arc<dyn TokenSigner>,
    verifier: Arc<dyn TokenVerifier>,
    password_hasher: auth::PasswordHasher,
    clock: Arc<dyn Clock>,
}

impl<UR, TS, EP> CredentialsService<UR, TS, EP>
where
    UR: UserRepository,
    TS: TokenStore,
    EP: EventPublisher,
{
    pub fn new(
        repository: Arc<UR>,
        token_store: Arc<TS>,
        event_publisher: Arc<EP>,
        signer: Arc<dyn TokenSigner>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            repository,
            token_store,
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

    async fn active_user(&self, subject: &str) -> Result<User, CredentialsError> {
        let user_id = UserId::from_string(subject).map_err(|_| CredentialsError::InvalidToken)?;
        self.repository
            .find_by_id(&user_id)
            .await?
            .filter(User::is_active)
            .ok_or(CredentialsError::InvalidToken)
    }

    /// Sign an access and refresh token for `user` without storing anything.
    fn sign_tokens(&self, user: &User) -> Result<(TokenPair, RefreshToken), CredentialsError> {
        let subject = user.id.to_string();

        let access = self
            .signer
            .create_access_token(&subject, &user.scopes())
            .map_err(|e| CredentialsError::Signing(e.to_string()))?;
        let refresh = self
            .signer
            .create_refresh_token(&subject)
            .map_err(|e| CredentialsError::Signing(e.to_string()))?;

        let record = RefreshToken::new(user.id, refresh.token.clone(), refresh.expires_in);
        let pair = TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: access.expires_in,
        };
        Ok((pair, record))
    }
}

#[async_trait]
impl<UR, TS, EP> CredentialsServicePort for CredentialsService<UR, TS, EP>
where
    UR: UserRepository,
    TS: TokenStore,
    EP: EventPublisher,
{
    async fn login(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<TokenPair, CredentialsError> {
        let user = self
            .repository
            .find_by_email(email)
            .await?
            .filter(User::is_active)
            .ok_or(CredentialsError::InvalidCredentials)?;

        let valid = self
            .password_hasher
            .verify(password, &user.password_hash)
            .map_err(|e| CredentialsError::Hashing(e.to_string()))?;
        if !valid {
            return Err(CredentialsError::InvalidCredentials);
        }

        let (tokens, record) = self.sign_tokens(&user)?;
        self.token_store.set_token(record).await?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(tokens)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, CredentialsError> {
        let claims = self
            .verifier
            .validate_refresh_token(refresh_token)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                CredentialsError::InvalidToken
            })?;

        let user = self.active_user(&claims.sub).await?;
        let (tokens, record) = self.sign_tokens(&user)?;

        // Revoking the presented token and storing its successor share one
        // store operation so a concurrent logout cannot miss the successor
        match self.token_store.rotate_token(refresh_token, record).await? {
            RevokeOutcome::Revoked => Ok(tokens),
            RevokeOutcome::Unknown => Err(CredentialsError::InvalidToken),
            RevokeOutcome::AlreadyRevoked => {
                let revoked = self.token_store.set_token_revoked(&user.id).await?;
                tracing::warn!(
                    user_id = %user.id,
                    revoked,
                    "Refresh token reuse detected, all sessions revoked"
                );
                Err(CredentialsError::TokenReused)
            }
        }
    }

    async fn logout(&self, user_id: &UserId) -> Result<(), CredentialsError> {
        let revoked = self.token_store.set_token_revoked(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "User logged out");
        Ok(())
    }

    async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), CredentialsError> {
        let Some(user) = self
            .repository
            .find_by_email(email)
            .await?
            .filter(User::is_active)
        else {
            tracing::debug!("Password reset requested for unknown or inactive account");
            return Ok(());
        };

        let reset = self
            .signer
            .create_password_reset_token(&user.id.to_string())
            .map_err(|e| CredentialsError::Signing(e.to_string()))?;

        let event = PasswordResetEvent {
            recipient: user.email.to_string(),
            channel: EMAIL_CHANNEL.to_string(),
            first_name: user.first_name.as_str().to_string(),
            last_name: user.last_name.as_str().to_string(),
            token: reset.token,
        };

        if let Err(e) = self.event_publisher.publish_password_reset(&event).await {
            tracing::error!(
                "Failed to publish PasswordReset event for user {}: {}",
                user.id,
                e
            );
            return Err(e.into());
        }

        Ok(())
    }

    async fn reset_password(
        &self,
        token: &str,
        new_password: Password,
    ) -> Result<(), CredentialsError> {
        let claims = self
            .verifier
            .validate_password_reset_token(token)
            .map_err(|e| {
                tracing::debug!(error = %e, "Password reset token rejected");
                CredentialsError::InvalidToken
            })?;

        let mut user = self.active_user(&claims.sub).await?;
        user.password_hash = self
            .password_hasher
            .hash(new_password.expose())
            .map_err(|e| CredentialsError::Hashing(e.to_string()))?;
        user.updated_at = self.clock.now();

        let user = self.repository.update(user).await?;
        self.token_store.set_token_revoked(&user.id).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use auth::ManualClock;
    use auth::PasswordHasher;
    use chrono::Utc;
    use mockall::mock;
    use tokio::sync::Notify;
    use transport::events::VerifyAccountEvent;

    use super::*;
    use crate::domain::credentials::errors::TokenStoreError;
    use crate::domain::credentials::models::RefreshTokenRecord;
    use crate::domain::user::models::Page;
    use crate::domain::user::models::PersonName;
    use crate::domain::user::models::UserRole;
    use crate::domain::user::models::UserStatus;
    use crate::outbound::repositories::token::InMemoryTokenStore;
    use crate::test_support;
    use crate::user::errors::EventPublisherError;
    use crate::user::errors::UserError;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: User) -> Result<User, UserError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
            async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;
            async fn list(&self, page: Page) -> Result<Vec<User>, UserError>;
            async fn update(&self, user: User) -> Result<User, UserError>;
            async fn delete(&self, id: &UserId) -> Result<(), UserError>;
        }
    }

    mock! {
        pub TestEventPublisher {}

        #[async_trait]
        impl EventPublisher for TestEventPublisher {
            async fn publish_password_reset(&self, event: &PasswordResetEvent) -> Result<(), EventPublisherError>;
            async fn publish_verify_account(&self, event: &VerifyAccountEvent) -> Result<(), EventPublisherError>;
        }
    }

    const PASSWORD: &str = "pass_word!";

    fn user(role: UserRole, status: UserStatus) -> User {
        User {
            id: UserId::new(),
            email: EmailAddress::new("ada@example.com".to_string()).unwrap(),
            first_name: PersonName::new("Ada".to_string()).unwrap(),
            last_name: PersonName::new("Lovelace".to_string()).unwrap(),
            password_hash: PasswordHasher::new().hash(PASSWORD).unwrap(),
            status,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn repository_with(user: User) -> MockTestUserRepository {
        let mut repository = MockTestUserRepository::new();
        let by_email = user.clone();
        repository
            .expect_find_by_email()
            .returning(move |_| Ok(Some(by_email.clone())));
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        repository
    }

    fn service(
        repository: MockTestUserRepository,
        token_store: Arc<InMemoryTokenStore>,
        event_publisher: MockTestEventPublisher,
    ) -> CredentialsService<MockTestUserRepository, InMemoryTokenStore, MockTestEventPublisher>
    {
        CredentialsService::new(
            Arc::new(repository),
            token_store,
            Arc::new(event_publisher),
            Arc::new(test_support::signer()),
            Arc::new(test_support::verifier()),
        )
    }

    /// Store that parks every rotation until the test releases it.
    struct PausedRotationStore {
        inner: Arc<InMemoryTokenStore>,
        rotating: Notify,
        resume: Notify,
    }

    #[async_trait]
    impl TokenStore for PausedRotationStore {
        async fn set_token(&self, token: RefreshToken) -> Result<(), TokenStoreError> {
            self.inner.set_token(token).await
        }

        async fn get_token(
            &self,
            token: &str,
        ) -> Result<Option<RefreshTokenRecord>, TokenStoreError> {
            self.inner.get_token(token).await
        }

        async fn is_token_revoked(&self, token: &str) -> Result<bool, TokenStoreError> {
            self.inner.is_token_revoked(token).await
        }

        async fn set_token_revoked(&self, user_id: &UserId) -> Result<usize, TokenStoreError> {
            self.inner.set_token_revoked(user_id).await
        }

        async fn revoke_token(&self, token: &str) -> Result<RevokeOutcome, TokenStoreError> {
            self.inner.revoke_token(token).await
        }

        async fn rotate_token(
            &self,
            old: &str,
            new: RefreshToken,
        ) -> Result<RevokeOutcome, TokenStoreError> {
            self.rotating.notify_one();
            self.resume.notified().await;
            self.inner.rotate_token(old, new).await
        }
    }

    fn token_store() -> Arc<InMemoryTokenStore> {
        Arc::new(InMemoryTokenStore::new(Arc::new(ManualClock::new(Utc::now()))))
    }

    fn email() -> EmailAddress {
        EmailAddress::new("ada@example.com".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_login_issues_tokens_and_records_refresh() {
        let store = token_store();
        let service = service(
            repository_with(user(UserRole::User, UserStatus::Active)),
            store.clone(),
            MockTestEventPublisher::new(),
        );

        let tokens = service.login(&email(), PASSWORD).await.unwrap();

        let claims = test_support::verifier()
            .validate_token(&tokens.access_token)
            .unwrap();
        assert!(claims.scopes().is_empty());
        assert_eq!(tokens.expires_in, chrono::Duration::minutes(15));

        let record = store.get_token(&tokens.refresh_token).await.unwrap().unwrap();
        assert!(!record.revoked);
        assert_eq!(record.ttl, chrono::Duration::days(7));
    }

    #[tokio::test]
    async fn test_admin_login_carries_admin_scopes() {
        let service = service(
            repository_with(user(UserRole::Admin, UserStatus::Active)),
            token_store(),
            MockTestEventPublisher::new(),
        );

        let tokens = service.login(&email(), PASSWORD).await.unwrap();
        let scopes = test_support::verifier()
            .validate_token(&tokens.access_token)
            .unwrap()
            .scopes();

        assert!(scopes.contains("all-users:read"));
        assert!(scopes.contains("all-users:write"));
    }

    #[tokio::test]
    async fn test_login_rejections() {
        let wrong_password = service(
            repository_with(user(UserRole::User, UserStatus::Active)),
            token_store(),
            MockTestEventPublisher::new(),
        );
        assert!(matches!(
            wrong_password.login(&email(), "wrong-password").await,
            Err(CredentialsError::InvalidCredentials)
        ));

        let pending = service(
            repository_with(user(UserRole::User, UserStatus::Pending)),
            token_store(),
            MockTestEventPublisher::new(),
        );
        assert!(matches!(
            pending.login(&email(), PASSWORD).await,
            Err(CredentialsError::InvalidCredentials)
        ));

        let mut repository = MockTestUserRepository::new();
        repository.expect_find_by_email().returning(|_| Ok(None));
        let unknown = service(repository, token_store(), MockTestEventPublisher::new());
        assert!(matches!(
            unknown.login(&email(), PASSWORD).await,
            Err(CredentialsError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let store = token_store();
        let service = service(
            repository_with(user(UserRole::User, UserStatus::Active)),
            store.clone(),
            MockTestEventPublisher::new(),
        );

        let first = service.login(&email(), PASSWORD).await.unwrap();
        let second = service.refresh(&first.refresh_token).await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert!(store.is_token_revoked(&first.refresh_token).await.unwrap());
        assert!(!store.is_token_revoked(&second.refresh_token).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_reuse_revokes_all_sessions() {
        let store = token_store();
        let service = service(
            repository_with(user(UserRole::User, UserStatus::Active)),
            store.clone(),
            MockTestEventPublisher::new(),
        );

        let first = service.login(&email(), PASSWORD).await.unwrap();
        let rotated = service.refresh(&first.refresh_token).await.unwrap();

        assert!(matches!(
            service.refresh(&first.refresh_token).await,
            Err(CredentialsError::TokenReused)
        ));
        assert!(store.is_token_revoked(&rotated.refresh_token).await.unwrap());
        assert!(matches!(
            service.refresh(&rotated.refresh_token).await,
            Err(CredentialsError::TokenReused)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_and_unknown_tokens() {
        let service = service(
            repository_with(user(UserRole::User, UserStatus::Active)),
            token_store(),
            MockTestEventPublisher::new(),
        );

        let tokens = service.login(&email(), PASSWORD).await.unwrap();
        assert!(matches!(
            service.refresh(&tokens.access_token).await,
            Err(CredentialsError::InvalidToken)
        ));

        let unknown = test_support::signer()
            .create_refresh_token(&UserId::new().to_string())
            .unwrap();
        assert!(matches!(
            service.refresh(&unknown.token).await,
            Err(CredentialsError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh_tokens() {
        let store = token_store();
        let active = user(UserRole::User, UserStatus::Active);
        let user_id = active.id;
        let service = service(repository_with(active), store.clone(), MockTestEventPublisher::new());

        let tokens = service.login(&email(), PASSWORD).await.unwrap();
        service.logout(&user_id).await.unwrap();

        assert!(store.is_token_revoked(&tokens.refresh_token).await.unwrap());
    }

    #[tokio::test]
    async fn test_logout_during_refresh_leaves_no_live_session() {
        let active = user(UserRole::User, UserStatus::Active);
        let user_id = active.id;
        let inner = token_store();
        let store = Arc::new(PausedRotationStore {
            inner: inner.clone(),
            rotating: Notify::new(),
            resume: Notify::new(),
        });
        let service = Arc::new(CredentialsService::new(
            Arc::new(repository_with(active)),
            store.clone(),
            Arc::new(MockTestEventPublisher::new()),
            Arc::new(test_support::signer()),
            Arc::new(test_support::verifier()),
        ));

        let session = service.login(&email(), PASSWORD).await.unwrap();

        let refreshing = {
            let service = service.clone();
            let refresh_token = session.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&refresh_token).await })
        };

        // Refresh has signed its successor and is about to store it
        store.rotating.notified().await;
        service.logout(&user_id).await.unwrap();
        store.resume.notify_one();

        assert!(matches!(
            refreshing.await.unwrap(),
            Err(CredentialsError::TokenReused)
        ));
        assert_eq!(inner.set_token_revoked(&user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_request_password_reset_publishes_event() {
        let mut event_publisher = MockTestEventPublisher::new();
        let (sender, receiver) = std::sync::mpsc::channel();
        event_publisher
            .expect_publish_password_reset()
            .withf(|event| event.recipient == "ada@example.com" && event.channel == "email")
            .times(1)
            .returning(move |event| {
                sender.send(event.token.clone()).unwrap();
                Ok(())
            });

        let active = user(UserRole::User, UserStatus::Active);
        let user_id = active.id;
        let service = service(repository_with(active), token_store(), event_publisher);

        service.request_password_reset(&email()).await.unwrap();

        let claims = test_support::verifier()
            .validate_password_reset_token(&receiver.recv().unwrap())
            .unwrap();
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[tokio::test]
    async fn test_request_password_reset_for_inactive_account_is_silent() {
        let mut event_publisher = MockTestEventPublisher::new();
        event_publisher.expect_publish_password_reset().times(0);

        let service = service(
            repository_with(user(UserRole::User, UserStatus::Pending)),
            token_store(),
            event_publisher,
        );

        assert!(service.request_password_reset(&email()).await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_password_updates_hash_and_ends_sessions() {
        let active = user(UserRole::User, UserStatus::Active);
        let user_id = active.id;
        let store = token_store();

        let mut repository = repository_with(active);
        repository
            .expect_update()
            .withf(|user| PasswordHasher::new().verify("new password", &user.password_hash).unwrap())
            .times(1)
            .returning(Ok);

        let service = service(repository, store.clone(), MockTestEventPublisher::new());
        let session = service.login(&email(), PASSWORD).await.unwrap();

        let reset = test_support::signer()
            .create_password_reset_token(&user_id.to_string())
            .unwrap();
        service
            .reset_password(&reset.token, Password::new("new password".to_string()).unwrap())
            .await
            .unwrap();

        assert!(store.is_token_revoked(&session.refresh_token).await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_password_rejects_access_token() {
        let active = user(UserRole::User, UserStatus::Active);
        let mut repository = repository_with(active);
        repository.expect_update().times(0);

        let service = service(repository, token_store(), MockTestEventPublisher::new());
        let tokens = service.login(&email(), PASSWORD).await.unwrap();

        assert!(matches!(
            service
                .reset_password(
                    &tokens.access_token,
                    Password::new("new password".to_string()).unwrap()
                )
                .await,
            Err(CredentialsError::InvalidToken)
        ));
    }
}
