use axum::{extract::State, routing::post, Json, Router};
use bejaia_admission::sanitizer::{clean_line, escape_html};
use bejaia_admission::validator::is_valid_email;
use bejaia_core::ContactMessage;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

const MAX_MESSAGE_LENGTH: usize = 5000;
const DEFAULT_SUBJECT: &str = "Nouveau message VisitBejaia";

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/contact", post(send_contact_message))
        .route("/send-email", post(send_contact_message))
}

fn optional_line(value: Option<String>) -> Option<String> {
    value.map(|v| clean_line(&v)).filter(|v| !v.is_empty())
}

async fn send_contact_message(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<Value>, AppError> {
    let text = req.message.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("message is required".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "message must be at most {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }

    let email = req.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(AppError::BadRequest("invalid e-mail".to_string()));
        }
    }

    let message = ContactMessage {
        subject: optional_line(req.subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        name: optional_line(req.name),
        email,
        phone: optional_line(req.phone),
        message: escape_html(text),
    };

    state
        .notifier
        .contact_message(&message)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to forward contact message: {}", e)))?;

    Ok(Json(json!({ "message": "received" })))
}
