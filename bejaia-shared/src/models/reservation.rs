use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Reservation status in the admin lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Accepted,
    Refused,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Accepted => "accepted",
            ReservationStatus::Refused => "refused",
        }
    }

    /// Accepted and refused reservations never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Pending)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" | "en_attente" => Ok(ReservationStatus::Pending),
            "accepted" | "acceptee" => Ok(ReservationStatus::Accepted),
            "refused" | "refusee" => Ok(ReservationStatus::Refused),
            other => Err(format!("unknown reservation status: {}", other)),
        }
    }
}

/// What the visitor is booking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReservationKind {
    Activity,
    Destination,
}

impl ReservationKind {
    /// Accepts the labels the booking forms send (french or english)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "activity" | "activite" | "activité" => Some(ReservationKind::Activity),
            "destination" | "voyage" | "trip" => Some(ReservationKind::Destination),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationKind::Activity => "activity",
            ReservationKind::Destination => "destination",
        }
    }
}

impl Default for ReservationKind {
    fn default() -> Self {
        ReservationKind::Destination
    }
}

/// A sanitized reservation request that has not been persisted yet.
///
/// This is also the payload carried by a verification token while the
/// visitor confirms their e-mail address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDraft {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub item_id: String,
    pub kind: ReservationKind,
    pub start_date: String,
    pub participants: i64,
    pub price_per_participant: f64,
    pub total_price: f64,
    pub regimen: Option<String>,
    pub special_requests: Option<String>,
    pub age: Option<i32>,
    pub address: Option<String>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

/// A persisted reservation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub item_id: String,
    pub kind: ReservationKind,
    pub start_date: NaiveDate,
    pub participants: i32,
    pub price_per_participant: f64,
    pub total_price: f64,
    pub regimen: Option<String>,
    pub special_requests: Option<String>,
    pub age: Option<i32>,
    pub address: Option<String>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Build the stored record from a validated draft. `start_date` is the
    /// parsed form of `draft.start_date`.
    pub fn from_draft(draft: ReservationDraft, start_date: NaiveDate) -> Self {
        let participants = i32::try_from(draft.participants).unwrap_or(i32::MAX);
        Self {
            id: Uuid::new_v4(),
            full_name: draft.full_name,
            email: draft.email,
            phone: draft.phone,
            item_id: draft.item_id,
            kind: draft.kind,
            start_date,
            participants,
            price_per_participant: draft.price_per_participant,
            total_price: draft.total_price,
            regimen: draft.regimen,
            special_requests: draft.special_requests,
            age: draft.age,
            address: draft.address,
            status: ReservationStatus::Pending,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        }
    }

    /// Update status, stamping `updated_at`
    pub fn update_status(&mut self, status: ReservationStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }
}
