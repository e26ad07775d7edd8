use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::errors::UserError;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Password;
use crate::domain::user::models::PersonName;
use crate::domain::user::models::UpdateCurrentUserCommand;
use crate::domain::user::ports::UserServicePort;
use crate::inbound::http::middleware::CurrentUser;
use crate::inbound::http::router::AppState;
use crate::user::errors::EmailError;
use crate::user::errors::NameError;
use crate::user::errors::PasswordPolicyError;

/// Edit the caller's own account. A token for a deleted account is rejected.
pub async fn update_current_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<UpdateCurrentUserRequest>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    state
        .user_service
        .update_current_user(&current.user_id, body.try_into_command()?)
        .await
        .map_err(|e| match e {
            UserError::NotFound(_) => ApiError::Unauthorized,
            e => ApiError::from(e),
        })
        .map(|ref user| ApiSuccess::new(StatusCode::OK, user.into()))
}

/// HTTP request body for a self-service account edit (raw JSON)
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateCurrentUserRequest {
    current_password: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Clone, Error)]
enum ParseUpdateCurrentUserRequestError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid name: {0}")]
    Name(#[from] NameError),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordPolicyError),
}

impl UpdateCurrentUserRequest {
    fn try_into_command(
        self,
    ) -> Result<UpdateCurrentUserCommand, ParseUpdateCurrentUserRequestError> {
        Ok(UpdateCurrentUserCommand {
            current_password: self.current_password,
            email: self.email.map(EmailAddress::new).transpose()?,
            first_name: self.first_name.map(PersonName::new).transpose()?,
            last_name: self.last_name.map(PersonName::new).transpose()?,
            password: self.password.map(Password::new).transpose()?,
        })
    }
}

impl From<ParseUpdateCurrentUserRequestError> for ApiError {
    fn from(err: ParseUpdateCurrentUserRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
