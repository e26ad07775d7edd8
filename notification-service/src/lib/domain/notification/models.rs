/// Values rendered into a password reset notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetVariables {
    pub first_name: String,
    pub last_name: String,
    pub reset_link: String,
    pub app_name: String,
}

/// Values rendered into an account verification notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyAccountVariables {
    pub first_name: String,
    pub last_name: String,
    pub verify_link: String,
    pub app_name: String,
}
