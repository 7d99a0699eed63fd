use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reservation::ReservationDraft;

/// Single-use e-mail verification token holding the unpersisted request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationToken {
    pub token: String,
    pub email: String,
    pub reservation: ReservationDraft,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
