use async_trait::async_trait;
use auth::AuthenticationError;
use auth::AuthenticationInput;
use auth::Principal;
use auth::RequestContext;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::user::models::UserId;
use crate::inbound::http::router::AppState;

/// Security requirement of a group of routes.
#[derive(Debug, Clone, Copy)]
pub struct RouteSecurity {
    pub scheme: &'static str,
    pub scopes: &'static [&'static str],
}

/// Middleware that authenticates the bearer token against the route's
/// security requirement and attaches the principal to the request context.
pub async fn authenticate(
    State((state, security)): State<(AppState, RouteSecurity)>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    let authorization = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| reject(AuthenticationError::InvalidAuthHeader))?,
        ),
        None => None,
    };

    let input = AuthenticationInput {
        security_scheme: security.scheme,
        authorization,
        scopes: security.scopes,
    };

    let principal = state
        .authenticator
        .authenticate(&input, &context)
        .map_err(reject)?;

    tracing::debug!(subject = %principal.subject(), "Request authenticated");

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

fn reject(err: AuthenticationError) -> ApiError {
    match &err {
        AuthenticationError::InvalidToken(_) => {
            tracing::warn!(error = %err, "Rejected bearer token")
        }
        _ if err.is_misconfiguration() => {
            tracing::error!(error = %err, "Authentication misconfigured")
        }
        _ => tracing::debug!(error = %err, "Authentication failed"),
    }
    ApiError::from(err)
}

/// The authenticated caller, read from the request context.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub principal: Principal,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<RequestContext>()
            .and_then(|context| context.principal())
            .cloned()
            .ok_or(ApiError::Unauthorized)?;

        let user_id = UserId::from_string(principal.subject()).map_err(|e| {
            tracing::warn!(subject = %principal.subject(), error = %e, "Token subject is not a user id");
            ApiError::Unauthorized
        })?;

        Ok(Self { user_id, principal })
    }
}
