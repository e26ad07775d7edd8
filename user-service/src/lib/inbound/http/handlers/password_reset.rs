use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use crate::domain::credentials::errors::CredentialsError;
use crate::domain::credentials::ports::CredentialsServicePort;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Password;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// Accepted regardless of whether the address belongs to an account.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetRequestBody>,
) -> Result<StatusCode, ApiError> {
    let email = EmailAddress::new(body.email).map_err(UserError::from)?;

    state
        .credentials_service
        .request_password_reset(&email)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<PasswordResetConfirmationBody>,
) -> Result<StatusCode, ApiError> {
    if body.new_password != body.confirm_password {
        return Err(ApiError::BadRequest("passwords do not match".to_string()));
    }

    let password = Password::new(body.new_password).map_err(UserError::from)?;

    state
        .credentials_service
        .reset_password(&token, password)
        .await
        .map_err(|e| match e {
            CredentialsError::InvalidToken => ApiError::BadRequest(e.to_string()),
            _ => ApiError::from(e),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PasswordResetRequestBody {
    email: String,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct PasswordResetConfirmationBody {
    new_password: String,
    confirm_password: String,
}
