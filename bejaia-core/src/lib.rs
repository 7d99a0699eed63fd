pub mod clock;
pub mod memory;
pub mod notify;
pub mod repository;
pub mod rules;

use bejaia_shared::ReservationStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use clock::{Clock, ManualClock, SystemClock};
pub use notify::{ContactMessage, LogNotifier, Notifier};
pub use repository::RepoError;
pub use rules::AdmissionRules;

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), message: message.into() }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Every recoverable outcome of the reservation core. Admission rejections
/// travel inside the decision as values of this type; admin and
/// verification operations return it as their error.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoreError {
    #[error("Validation failed: {}", summarize(.errors))]
    Validation { errors: Vec<FieldError> },

    #[error("Date {date} is blocked for {item_id}")]
    BlockedDate { item_id: String, date: NaiveDate },

    #[error("Too many reservations for this phone today ({count}/{limit}), try again tomorrow")]
    RateLimited { count: usize, limit: usize },

    #[error("Reservation quota reached for this e-mail ({count}/{limit}), contact support")]
    QuotaExceeded { count: usize, limit: usize },

    #[error("Duplicate reservation detected ({count} recent)")]
    Duplicate { count: usize },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("Date {date} is already blocked for {item_id}")]
    AlreadyBlocked { item_id: String, date: NaiveDate },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: ReservationStatus, to: ReservationStatus },

    #[error("Verification token expired")]
    TokenExpired,

    #[error("Verification token not found")]
    TokenNotFound,

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl CoreError {
    pub fn storage(err: RepoError) -> Self {
        CoreError::Storage { message: err.to_string() }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CoreError::NotFound { what: what.into() }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
