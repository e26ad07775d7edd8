use axum::extract::State;
use axum::http::StatusCode;

use super::ApiError;
use crate::domain::credentials::ports::CredentialsServicePort;
use crate::inbound::http::middleware::CurrentUser;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.credentials_service.logout(&current.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
