use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BLOCK_REASON: &str = "blocked by admin";

/// A date on which an item cannot be reserved. `(item_id, date)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockedDate {
    pub item_id: String,
    pub date: NaiveDate,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl BlockedDate {
    pub fn new(item_id: String, date: NaiveDate, reason: Option<String>, created_at: DateTime<Utc>) -> Self {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string());
        Self { item_id, date, reason, created_at }
    }
}
