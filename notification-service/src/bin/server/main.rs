use std::sync::Arc;

use notification_service::config::Config;
use notification_service::config::LogFormat;
use notification_service::domain::notification::service::NotificationService;
use notification_service::inbound::events::PasswordResetHandler;
use notification_service::inbound::events::VerifyAccountHandler;
use notification_service::inbound::http::create_router;
use notification_service::outbound::channels::LogChannel;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use transport::events::PASSWORD_RESET_TOPIC;
use transport::events::VERIFY_ACCOUNT_TOPIC;
use transport::Tracer;
use transport::Transport;

const SERVICE_NAME: &str = "notification-service";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::load()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notification_service=debug,transport=debug,tower_http=debug".into());
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
        org_name = %config.general.org_name,
        website_base_url = %config.general.website_base_url,
        transport = ?config.transport,
        "Configuration loaded"
    );

    let notification_service = Arc::new(NotificationService::new(
        config.general.org_name.clone(),
        config.general.website_base_url.clone(),
        Arc::new(LogChannel::new()),
    ));

    let tracer = Tracer::new(SERVICE_NAME);
    let consumer = Transport::from_config(&config.transport).consumer(&tracer);

    let password_reset = consumer
        .consume(
            PASSWORD_RESET_TOPIC,
            Arc::new(PasswordResetHandler::new(Arc::clone(&notification_service))),
        )
        .await?;
    tracing::info!(topic = PASSWORD_RESET_TOPIC, "Consumer started");

    let verify_account = consumer
        .consume(
            VERIFY_ACCOUNT_TOPIC,
            Arc::new(VerifyAccountHandler::new(notification_service)),
        )
        .await?;
    tracing::info!(topic = VERIFY_ACCOUNT_TOPIC, "Consumer started");

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let served = axum::serve(listener, create_router())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    for connection in [password_reset, verify_account] {
        if let Err(e) = connection.disconnect().await {
            tracing::error!(error = %e, "Failed to disconnect consumer");
        }
    }

    served?;
    tracing::info!("Server exited successfully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
