use auth::AuthenticationError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::domain::credentials::errors::CredentialsError;
use crate::domain::credentials::models::TokenPair;
use crate::domain::user::models::User;
use crate::domain::user::models::UserRole;
use crate::domain::user::models::UserStatus;
use crate::user::errors::UserError;

pub mod current_user;
pub mod delete_user;
pub mod get_user;
pub mod list_users;
pub mod login;
pub mod logout;
pub mod password_reset;
pub mod refresh;
pub mod register_user;
pub mod update_current_user;
pub mod update_user;
pub mod verify_account;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<T>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(data))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized,
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, Some(msg))
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Some(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, Some(msg)),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, None),
        };

        (status, Json(ApiErrorBody::new(status, message))).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) => ApiError::NotFound(err.to_string()),
            UserError::EmailAlreadyExists(_) => ApiError::Conflict(err.to_string()),
            UserError::InvalidUserId(_)
            | UserError::InvalidEmail(_)
            | UserError::InvalidName(_)
            | UserError::InvalidPassword(_)
            | UserError::InvalidToken
            | UserError::IncorrectPassword => ApiError::BadRequest(err.to_string()),
            UserError::Hashing(_)
            | UserError::Signing(_)
            | UserError::Repository(_)
            | UserError::EventPublishing(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<CredentialsError> for ApiError {
    fn from(err: CredentialsError) -> Self {
        match err {
            CredentialsError::InvalidCredentials
            | CredentialsError::InvalidToken
            | CredentialsError::TokenReused => ApiError::Unauthorized,
            CredentialsError::User(err) => ApiError::from(err),
            CredentialsError::Hashing(_)
            | CredentialsError::Signing(_)
            | CredentialsError::TokenStore(_)
            | CredentialsError::EventPublishing(_) => {
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<AuthenticationError> for ApiError {
    fn from(err: AuthenticationError) -> Self {
        if err.is_misconfiguration() {
            ApiError::InternalServerError(err.to_string())
        } else {
            ApiError::Unauthorized
        }
    }
}

/// Error body shared by every route: `{statusCode, status, code?, error?}`.
///
/// `code` is reserved for application error codes and is not emitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub status_code: u16,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn new(status_code: StatusCode, error: Option<String>) -> Self {
        Self {
            status_code: status_code.as_u16(),
            status: status_code
                .canonical_reason()
                .unwrap_or_default()
                .to_string(),
            code: None,
            error,
        }
    }
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.as_str().to_string(),
            first_name: user.first_name.as_str().to_string(),
            last_name: user.last_name.as_str().to_string(),
            role: user.role,
            status: user.status,
            created_at: user.created_at,
        }
    }
}

/// Body returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponseData {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl From<TokenPair> for TokenResponseData {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in.num_seconds(),
        }
    }
}
