use async_trait::async_trait;
use bejaia_shared::{AttemptLogEntry, BlockedDate, Reservation, ReservationStatus, VerificationToken};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub type RepoError = Box<dyn std::error::Error + Send + Sync>;

/// Repository trait for persisted reservations
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn create(&self, reservation: &Reservation) -> Result<(), RepoError>;

    /// All reservations, newest first
    async fn list(&self) -> Result<Vec<Reservation>, RepoError>;

    async fn get(&self, id: Uuid) -> Result<Option<Reservation>, RepoError>;

    /// Moves `id` from `from` to `to` only if it is still in `from`.
    /// Returns the updated row, or `None` when nothing matched.
    async fn update_status(
        &self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Reservation>, RepoError>;
}

/// Repository trait for blocked dates
#[async_trait]
pub trait BlockedDateRepository: Send + Sync {
    /// Blocked dates of an item, ascending
    async fn list(&self, item_id: &str) -> Result<Vec<BlockedDate>, RepoError>;

    /// Inserts the entry. Returns `false` if the pair already existed.
    async fn create(&self, blocked: &BlockedDate) -> Result<bool, RepoError>;

    async fn find_one(&self, item_id: &str, date: NaiveDate) -> Result<Option<BlockedDate>, RepoError>;

    /// Returns `false` if there was nothing to delete
    async fn delete(&self, item_id: &str, date: NaiveDate) -> Result<bool, RepoError>;
}

/// Bounded, append-only history of reservation attempts
#[async_trait]
pub trait AttemptLog: Send + Sync {
    async fn append(&self, entry: &AttemptLogEntry) -> Result<(), RepoError>;

    /// Retained entries, oldest first
    async fn recent(&self) -> Result<Vec<AttemptLogEntry>, RepoError>;
}

/// Storage for verification tokens and verified e-mails
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Stores the token, replacing any outstanding token for the same e-mail
    async fn put(&self, token: &VerificationToken) -> Result<(), RepoError>;

    async fn find(&self, token: &str) -> Result<Option<VerificationToken>, RepoError>;

    /// Deletes the token. Only one concurrent caller observes `true`.
    async fn remove(&self, token: &str) -> Result<bool, RepoError>;

    async fn list(&self) -> Result<Vec<VerificationToken>, RepoError>;

    async fn mark_verified(&self, email: &str) -> Result<(), RepoError>;

    async fn is_verified(&self, email: &str) -> Result<bool, RepoError>;
}

/// Fixed-window request counter
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts one hit for `key`; `true` while the window total stays within `limit`
    async fn check(&self, key: &str, limit: u64, window_seconds: u64) -> Result<bool, RepoError>;
}
