pub mod handlers;

pub use handlers::PasswordResetHandler;
pub use handlers::VerifyAccountHandler;
