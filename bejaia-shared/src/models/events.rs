use serde::{Deserialize, Serialize};

/// Published when a visitor has to confirm their e-mail address
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerificationRequestedEvent {
    pub email: String,
    pub token: String,
    pub timestamp: i64,
}

/// Contact form submission for the site inbox
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContactMessageEvent {
    pub subject: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: String,
    pub timestamp: i64,
}
