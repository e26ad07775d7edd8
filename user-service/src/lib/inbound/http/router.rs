use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use auth::TokenVerifier;
use auth::BEARER_AUTH;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::current_user::current_user;
use super::handlers::delete_user::delete_user;
use super::handlers::get_user::get_user;
use super::handlers::list_users::list_users;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::password_reset::request_password_reset;
use super::handlers::password_reset::reset_password;
use super::handlers::refresh::refresh;
use super::handlers::register_user::register_user;
use super::handlers::update_current_user::update_current_user;
use super::handlers::update_user::update_user;
use super::handlers::verify_account::verify_account;
use super::middleware::authenticate;
use super::middleware::RouteSecurity;
use crate::domain::credentials::service::CredentialsService;
use crate::domain::user::models::ALL_USERS_READ;
use crate::domain::user::models::ALL_USERS_WRITE;
use crate::domain::user::service::UserService;
use crate::outbound::events::TransportEventPublisher;
use crate::outbound::repositories::InMemoryTokenStore;
use crate::outbound::repositories::InMemoryUserRepository;

pub type Users = UserService<InMemoryUserRepository, TransportEventPublisher>;

pub type Credentials =
    CredentialsService<InMemoryUserRepository, InMemoryTokenStore, TransportEventPublisher>;

pub type BearerAuthenticator = Authenticator<Arc<dyn TokenVerifier>>;

const AUTHENTICATED: RouteSecurity = RouteSecurity {
    scheme: BEARER_AUTH,
    scopes: &[],
};

const READ_ALL_USERS: RouteSecurity = RouteSecurity {
    scheme: BEARER_AUTH,
    scopes: &[ALL_USERS_READ],
};

const WRITE_ALL_USERS: RouteSecurity = RouteSecurity {
    scheme: BEARER_AUTH,
    scopes: &[ALL_USERS_WRITE],
};

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<Users>,
    pub credentials_service: Arc<Credentials>,
    pub authenticator: Arc<BearerAuthenticator>,
}

pub fn create_router(
    user_service: Arc<Users>,
    credentials_service: Arc<Credentials>,
    authenticator: Arc<BearerAuthenticator>,
) -> Router {
    let state = AppState {
        user_service,
        credentials_service,
        authenticator,
    };

    let guard = |security: RouteSecurity| {
        middleware::from_fn_with_state((state.clone(), security), authenticate)
    };

    let public_routes = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/password-reset", post(request_password_reset))
        .route("/api/auth/password-reset/:token", post(reset_password))
        .route("/api/users", post(register_user))
        .route("/api/users/verify/:token", post(verify_account));

    let authenticated_routes = Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/users/me", get(current_user).put(update_current_user))
        .route_layer(guard(AUTHENTICATED));

    let read_routes = Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/:user_id", get(get_user))
        .route_layer(guard(READ_ALL_USERS));

    let write_routes = Router::new()
        .route("/api/users/:user_id", put(update_user).delete(delete_user))
        .route_layer(guard(WRITE_ALL_USERS));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(read_routes)
        .merge(write_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
