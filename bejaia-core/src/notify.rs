use async_trait::async_trait;
use bejaia_shared::pii::{mask_email, mask_token};
use serde::{Deserialize, Serialize};

use crate::repository::RepoError;

/// A message from the contact form, forwarded to the site inbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub subject: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: String,
}

/// Outbound notifications. Callers treat delivery as fire-and-forget.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the visitor to confirm `email` with `token`
    async fn verification_requested(&self, email: &str, token: &str) -> Result<(), RepoError>;

    async fn contact_message(&self, message: &ContactMessage) -> Result<(), RepoError>;
}

/// Notifier that only writes to the log. Used when no broker is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn verification_requested(&self, email: &str, token: &str) -> Result<(), RepoError> {
        tracing::info!(
            "Verification requested for {} (token {})",
            mask_email(email),
            mask_token(token)
        );
        // without a broker this is the only way to reach the link in development
        tracing::debug!("Verification link: reservation.html?verify={}", token);
        Ok(())
    }

    async fn contact_message(&self, message: &ContactMessage) -> Result<(), RepoError> {
        tracing::info!("Contact message received: {}", message.subject);
        Ok(())
    }
}
