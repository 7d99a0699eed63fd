use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reservation attempt, successful or not. The log is append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptLogEntry {
    pub email: String,
    pub phone: String,
    pub full_name: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
    pub fingerprint: String,
}
