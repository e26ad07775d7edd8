#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use auth::JwtSigner;
use auth::JwtVerifier;
use auth::SystemClock;
use auth::TokenSettings;
use auth::TokenSigner;
use auth::TokenVerifier;
use serde_json::json;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use transport::events::PasswordResetEvent;
use transport::events::VerifyAccountEvent;
use transport::events::PASSWORD_RESET_TOPIC;
use transport::events::VERIFY_ACCOUNT_TOPIC;
use transport::handler_fn;
use transport::memory::InMemoryBroker;
use transport::Connection;
use transport::Consumer;
use transport::Message;
use transport::Tracer;
use user_service::domain::credentials::service::CredentialsService;
use user_service::domain::user::models::EmailAddress;
use user_service::domain::user::models::Password;
use user_service::domain::user::models::PersonName;
use user_service::domain::user::models::RegisterUserCommand;
use user_service::domain::user::service::UserService;
use user_service::inbound::http::router::create_router;
use user_service::outbound::events::TransportEventPublisher;
use user_service::outbound::repositories::InMemoryTokenStore;
use user_service::outbound::repositories::InMemoryUserRepository;

pub const ISSUER: &str = "blog";
pub const AUDIENCE: &str = "blog-api";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "correct-horse-battery";

const PRIVATE_KEY: &[u8] = include_bytes!("../../../auth/fixtures/ec_private.pem");
const PUBLIC_KEY: &[u8] = include_bytes!("../../../auth/fixtures/ec_public.pem");

/// Test application that spawns a real server on the in-memory transport
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub signer: JwtSigner,
    verify_account_events: Mutex<mpsc::UnboundedReceiver<Message>>,
    password_reset_events: Mutex<mpsc::UnboundedReceiver<Message>>,
    connections: Vec<Box<dyn Connection>>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let broker = InMemoryBroker::new();
        let (verify_account_events, verify_account_connection) =
            capture(&broker, VERIFY_ACCOUNT_TOPIC).await;
        let (password_reset_events, password_reset_connection) =
            capture(&broker, PASSWORD_RESET_TOPIC).await;

        let tracer = Tracer::new("user-service");
        let event_publisher = Arc::new(TransportEventPublisher::new(
            Arc::new(broker.producer(tracer.clone())),
            tracer,
            Duration::from_secs(1),
        ));

        let signer: Arc<dyn TokenSigner> = Arc::new(signer());
        let verifier: Arc<dyn TokenVerifier> =
            Arc::new(JwtVerifier::new(PUBLIC_KEY, ISSUER, AUDIENCE).unwrap());

        let user_repository = Arc::new(InMemoryUserRepository::new());
        let token_store = Arc::new(InMemoryTokenStore::new(Arc::new(SystemClock)));

        let user_service = Arc::new(UserService::new(
            user_repository.clone(),
            event_publisher.clone(),
            signer.clone(),
            verifier.clone(),
        ));
        let credentials_service = Arc::new(CredentialsService::new(
            user_repository,
            token_store,
            event_publisher,
            signer,
            verifier.clone(),
        ));

        user_service
            .ensure_admin(RegisterUserCommand::new(
                EmailAddress::new(ADMIN_EMAIL.to_string()).unwrap(),
                PersonName::new("Site".to_string()).unwrap(),
                PersonName::new("Admin".to_string()).unwrap(),
                Password::new(ADMIN_PASSWORD.to_string()).unwrap(),
            ))
            .await
            .expect("Failed to create admin");

        let router = create_router(
            user_service,
            credentials_service,
            Arc::new(Authenticator::new(verifier)),
        );

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::new(),
            signer: self::signer(),
            verify_account_events: Mutex::new(verify_account_events),
            password_reset_events: Mutex::new(password_reset_events),
            connections: vec![verify_account_connection, password_reset_connection],
        }
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(format!("{}{}", self.address, path))
    }

    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.delete(format!("{}{}", self.address, path))
    }

    /// Register an account and return the verification event it triggered
    pub async fn register(&self, email: &str) -> VerifyAccountEvent {
        let response = self
            .post("/api/users")
            .json(&json!({
                "email": email,
                "first_name": "Ada",
                "last_name": "Lovelace",
                "password": PASSWORD
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        self.next_verify_account_event().await
    }

    /// Register and verify an account so it can log in
    pub async fn register_active(&self, email: &str) {
        let event = self.register(email).await;
        let response = self
            .post(&format!("/api/users/verify/{}", event.token))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in and return the token response body
    pub async fn tokens(&self, email: &str, password: &str) -> Value {
        let response = self.login(email, password).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("Failed to parse response")
    }

    pub async fn next_verify_account_event(&self) -> VerifyAccountEvent {
        next_event(&self.verify_account_events).await
    }

    pub async fn next_password_reset_event(&self) -> PasswordResetEvent {
        next_event(&self.password_reset_events).await
    }

    /// Whether a password reset event arrives within a short window
    pub async fn password_reset_published(&self) -> bool {
        let mut events = self.password_reset_events.lock().await;
        tokio::time::timeout(Duration::from_millis(200), events.recv())
            .await
            .is_ok()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let connections = std::mem::take(&mut self.connections);
        tokio::spawn(async move {
            for connection in connections {
                let _ = connection.disconnect().await;
            }
        });
    }
}

pub fn signer() -> JwtSigner {
    JwtSigner::new(PRIVATE_KEY, TokenSettings::new(ISSUER, AUDIENCE)).unwrap()
}

async fn capture(
    broker: &InMemoryBroker,
    topic: &str,
) -> (mpsc::UnboundedReceiver<Message>, Box<dyn Connection>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let connection = broker
        .consumer("notification-service", Tracer::new("notification-service"))
        .consume(
            topic,
            handler_fn(move |_cx, message| {
                let sender = sender.clone();
                async move {
                    let _ = sender.send(message);
                }
            }),
        )
        .await
        .expect("Failed to subscribe");

    (receiver, connection)
}

async fn next_event<T: serde::de::DeserializeOwned>(
    events: &Mutex<mpsc::UnboundedReceiver<Message>>,
) -> T {
    let message = tokio::time::timeout(Duration::from_secs(2), events.lock().await.recv())
        .await
        .expect("Timed out waiting for event")
        .expect("Event channel closed");

    message.payload().expect("Failed to decode event payload")
}
