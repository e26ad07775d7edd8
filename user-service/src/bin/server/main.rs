use std::sync::Arc;

use auth::Authenticator;
use auth::JwtSigner;
use auth::JwtVerifier;
use auth::SystemClock;
use auth::TokenSettings;
use auth::TokenSigner;
use auth::TokenVerifier;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use transport::Tracer;
use transport::Transport;
use transport::TransportConfig;
use user_service::config::BootstrapAdminConfig;
use user_service::config::Config;
use user_service::config::LogFormat;
use user_service::domain::credentials::service::CredentialsService;
use user_service::domain::user::models::EmailAddress;
use user_service::domain::user::models::Password;
use user_service::domain::user::models::PersonName;
use user_service::domain::user::models::RegisterUserCommand;
use user_service::domain::user::service::UserService;
use user_service::inbound::http::router::create_router;
use user_service::inbound::http::router::Users;
use user_service::outbound::events::TransportEventPublisher;
use user_service::outbound::repositories::InMemoryTokenStore;
use user_service::outbound::repositories::InMemoryUserRepository;

const SERVICE_NAME: &str = "user-service";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::load()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "user_service=debug,transport=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.observability.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!(
        service = SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );
    tracing::info!(
        http_port = config.server.http_port,
        issuer = %config.auth.issuer,
        audience = %config.auth.audience,
        transport = ?config.transport,
        "Configuration loaded"
    );

    let private_key = config.auth.private_key.load()?;
    let public_key = config.auth.public_key.load()?;

    let settings = TokenSettings::new(&config.auth.issuer, &config.auth.audience)
        .with_access_token_ttl(config.auth.access_token_ttl())
        .with_refresh_token_ttl(config.auth.refresh_token_ttl());
    let signer: Arc<dyn TokenSigner> = Arc::new(JwtSigner::new(&private_key, settings)?);
    let verifier: Arc<dyn TokenVerifier> = Arc::new(JwtVerifier::new(
        &public_key,
        &config.auth.issuer,
        &config.auth.audience,
    )?);
    tracing::info!(algorithm = "ES256", "Token keys loaded");

    if matches!(config.transport, TransportConfig::Memory) {
        tracing::warn!("In-memory transport selected, events stay inside this process");
    }
    let tracer = Tracer::new(SERVICE_NAME);
    let transport = Transport::from_config(&config.transport);
    let event_publisher = Arc::new(TransportEventPublisher::new(
        transport.producer(&tracer),
        tracer,
        config.events.publish_timeout(),
    ));

    let user_repository = Arc::new(InMemoryUserRepository::new());
    let token_store = Arc::new(InMemoryTokenStore::new(Arc::new(SystemClock)));

    let user_service = Arc::new(UserService::new(
        Arc::clone(&user_repository),
        Arc::clone(&event_publisher),
        Arc::clone(&signer),
        Arc::clone(&verifier),
    ));
    let credentials_service = Arc::new(CredentialsService::new(
        user_repository,
        token_store,
        event_publisher,
        signer,
        Arc::clone(&verifier),
    ));

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap_admin(&user_service, admin).await?;
    }

    let authenticator = Arc::new(Authenticator::new(verifier));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(user_service, credentials_service, authenticator);
    axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server exited successfully");
    Ok(())
}

async fn bootstrap_admin(
    user_service: &Users,
    admin: &BootstrapAdminConfig,
) -> Result<(), anyhow::Error> {
    let command = RegisterUserCommand::new(
        EmailAddress::new(admin.email.clone())?,
        PersonName::new(admin.first_name.clone())?,
        PersonName::new(admin.last_name.clone())?,
        Password::new(admin.password.clone())?,
    );

    let user = user_service.ensure_admin(command).await?;
    tracing::info!(user_id = %user.id, email = %user.email, "Bootstrap admin ready");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
