use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use auth::Clock;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::credentials::errors::TokenStoreError;
use crate::domain::credentials::models::RefreshToken;
use crate::domain::credentials::models::RefreshTokenRecord;
use crate::domain::credentials::models::RevokeOutcome;
use crate::domain::credentials::ports::TokenStore;
use crate::domain::user::models::UserId;

/// Refresh token store keyed by token string.
///
/// One lock guards the whole map, so every operation is a single atomic
/// read-modify-write.
pub struct InMemoryTokenStore {
    records: Mutex<HashMap<String, RefreshTokenRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTokenStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn set_token(&self, token: RefreshToken) -> Result<(), TokenStoreError> {
        let mut records = self.records.lock().await;
        upsert(&mut records, token, self.clock.now());
        Ok(())
    }

    async fn get_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, TokenStoreError> {
        Ok(self.records.lock().await.get(token).cloned())
    }

    async fn is_token_revoked(&self, token: &str) -> Result<bool, TokenStoreError> {
        Ok(self
            .records
            .lock()
            .await
            .get(token)
            .is_some_and(|record| record.revoked))
    }

    async fn set_token_revoked(&self, user_id: &UserId) -> Result<usize, TokenStoreError> {
        let mut records = self.records.lock().await;
        let now = self.clock.now();

        let mut revoked = 0;
        for record in records
            .values_mut()
            .filter(|record| &record.user_id == user_id && !record.revoked)
        {
            record.revoked = true;
            record.updated_at = now;
            revoked += 1;
        }

        Ok(revoked)
    }

    async fn revoke_token(&self, token: &str) -> Result<RevokeOutcome, TokenStoreError> {
        let mut records = self.records.lock().await;
        Ok(revoke(&mut records, token, self.clock.now()))
    }

    async fn rotate_token(
        &self,
        old: &str,
        new: RefreshToken,
    ) -> Result<RevokeOutcome, TokenStoreError> {
        let mut records = self.records.lock().await;
        let now = self.clock.now();

        let outcome = revoke(&mut records, old, now);
        if outcome == RevokeOutcome::Revoked {
            upsert(&mut records, new, now);
        }
        Ok(outcome)
    }
}

fn upsert(
    records: &mut HashMap<String, RefreshTokenRecord>,
    token: RefreshToken,
    now: DateTime<Utc>,
) {
    match records.get_mut(&token.token) {
        Some(record) => {
            record.user_id = token.user_id;
            record.ttl = token.ttl;
            record.revoked |= token.revoked;
            record.updated_at = now;
        }
        None => {
            records.insert(
                token.token.clone(),
                RefreshTokenRecord {
                    user_id: token.user_id,
                    token: token.token,
                    ttl: token.ttl,
                    revoked: token.revoked,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
    }
}

fn revoke(
    records: &mut HashMap<String, RefreshTokenRecord>,
    token: &str,
    now: DateTime<Utc>,
) -> RevokeOutcome {
    let Some(record) = records.get_mut(token) else {
        return RevokeOutcome::Unknown;
    };

    if record.revoked {
        return RevokeOutcome::AlreadyRevoked;
    }

    record.revoked = true;
    record.updated_at = now;
    RevokeOutcome::Revoked
}
