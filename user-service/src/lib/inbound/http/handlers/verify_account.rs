use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;

use super::ApiError;
use crate::domain::user::ports::UserServicePort;
use crate::inbound::http::router::AppState;

pub async fn verify_account(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = state.user_service.verify_account(&token).await?;

    tracing::info!(user_id = %user.id, "Account verified");
    Ok(StatusCode::NO_CONTENT)
}
