use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::TokenResponseData;
use crate::domain::credentials::ports::CredentialsServicePort;
use crate::domain::user::models::EmailAddress;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequestBody>,
) -> Result<ApiSuccess<TokenResponseData>, ApiError> {
    let email = EmailAddress::new(body.email).map_err(UserError::from)?;

    let tokens = state
        .credentials_service
        .login(&email, &body.password)
        .await
        .map_err(|e| {
            tracing::debug!(email = %email, error = %e, "Login rejected");
            ApiError::from(e)
        })?;

    Ok(ApiSuccess::new(StatusCode::OK, tokens.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    email: String,
    password: String,
}
