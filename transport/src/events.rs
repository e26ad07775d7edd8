//! Events exchanged between the user service and the notification service.

use serde::Deserialize;
use serde::Serialize;

pub const PASSWORD_RESET_TOPIC: &str = "password-reset";
pub const VERIFY_ACCOUNT_TOPIC: &str = "verify-account";

pub const PASSWORD_RESET_MESSAGE: &str = "PasswordReset";
pub const VERIFY_ACCOUNT_MESSAGE: &str = "VerifyAccount";

/// Delivery channel for notifications. Only email is delivered today.
pub const EMAIL_CHANNEL: &str = "email";

/// A user asked to reset their password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetEvent {
    pub recipient: String,
    pub channel: String,
    pub first_name: String,
    pub last_name: String,
    pub token: String,
}

/// A user registered and must confirm their address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyAccountEvent {
    pub recipient: String,
    pub channel: String,
    pub first_name: String,
    pub last_name: String,
    pub token: String,
}
