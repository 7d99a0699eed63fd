//! In-memory implementations of the repository traits.
//!
//! They back the test suites and the single-node development mode of the
//! HTTP service.

use async_trait::async_trait;
use bejaia_shared::{AttemptLogEntry, BlockedDate, Reservation, ReservationStatus, VerificationToken};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::clock::Clock;
use crate::repository::{
    AttemptLog, BlockedDateRepository, RateLimiter, RepoError, ReservationRepository, TokenRepository,
};

#[derive(Default)]
pub struct InMemoryReservationRepository {
    reservations: RwLock<HashMap<Uuid, Reservation>>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn create(&self, reservation: &Reservation) -> Result<(), RepoError> {
        let mut reservations = self.reservations.write().await;
        if reservations.contains_key(&reservation.id) {
            return Err(format!("reservation {} already exists", reservation.id).into());
        }
        reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Reservation>, RepoError> {
        let mut all: Vec<Reservation> = self.reservations.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Reservation>, RepoError> {
        Ok(self.reservations.read().await.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Reservation>, RepoError> {
        let mut reservations = self.reservations.write().await;
        match reservations.get_mut(&id) {
            Some(r) if r.status == from => {
                r.update_status(to, at);
                Ok(Some(r.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct InMemoryBlockedDateRepository {
    blocked: RwLock<BTreeMap<(String, NaiveDate), BlockedDate>>,
}

impl InMemoryBlockedDateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockedDateRepository for InMemoryBlockedDateRepository {
    async fn list(&self, item_id: &str) -> Result<Vec<BlockedDate>, RepoError> {
        // BTreeMap keys sort by item then date
        Ok(self
            .blocked
            .read()
            .await
            .values()
            .filter(|b| b.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn create(&self, blocked: &BlockedDate) -> Result<bool, RepoError> {
        let mut map = self.blocked.write().await;
        let key = (blocked.item_id.clone(), blocked.date);
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key, blocked.clone());
        Ok(true)
    }

    async fn find_one(&self, item_id: &str, date: NaiveDate) -> Result<Option<BlockedDate>, RepoError> {
        Ok(self.blocked.read().await.get(&(item_id.to_string(), date)).cloned())
    }

    async fn delete(&self, item_id: &str, date: NaiveDate) -> Result<bool, RepoError> {
        Ok(self.blocked.write().await.remove(&(item_id.to_string(), date)).is_some())
    }
}

/// FIFO-bounded attempt history
pub struct InMemoryAttemptLog {
    entries: Mutex<VecDeque<AttemptLogEntry>>,
    capacity: usize,
}

impl InMemoryAttemptLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }
}

#[async_trait]
impl AttemptLog for InMemoryAttemptLog {
    async fn append(&self, entry: &AttemptLogEntry) -> Result<(), RepoError> {
        let mut entries = self.entries.lock().await;
        entries.push_back(entry.clone());
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        Ok(())
    }

    async fn recent(&self) -> Result<Vec<AttemptLogEntry>, RepoError> {
        Ok(self.entries.lock().await.iter().cloned().collect())
    }
}

#[derive(Default)]
struct TokenState {
    by_email: HashMap<String, String>,
    tokens: HashMap<String, VerificationToken>,
    verified: HashSet<String>,
}

#[derive(Default)]
pub struct InMemoryTokenRepository {
    state: Mutex<TokenState>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn put(&self, token: &VerificationToken) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        if let Some(previous) = state.by_email.insert(token.email.clone(), token.token.clone()) {
            state.tokens.remove(&previous);
        }
        state.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<VerificationToken>, RepoError> {
        Ok(self.state.lock().await.tokens.get(token).cloned())
    }

    async fn remove(&self, token: &str) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        match state.tokens.remove(token) {
            Some(removed) => {
                if state.by_email.get(&removed.email).map(String::as_str) == Some(token) {
                    state.by_email.remove(&removed.email);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<VerificationToken>, RepoError> {
        let mut all: Vec<VerificationToken> = self.state.lock().await.tokens.values().cloned().collect();
        all.sort_by(|a, b| a.issued_at.cmp(&b.issued_at));
        Ok(all)
    }

    async fn mark_verified(&self, email: &str) -> Result<(), RepoError> {
        self.state.lock().await.verified.insert(email.to_string());
        Ok(())
    }

    async fn is_verified(&self, email: &str) -> Result<bool, RepoError> {
        Ok(self.state.lock().await.verified.contains(email))
    }
}

/// Fixed-window counter keyed by caller identity
/// Fixed-window counters. Each entry holds the hit count and the end of its
/// window; elapsed windows are evicted on every check.
pub struct InMemoryRateLimiter {
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, (u64, DateTime<Utc>)>>,
}

impl InMemoryRateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, windows: Mutex::new(HashMap::new()) }
    }

    /// Number of keys with an open window
    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str, limit: u64, window_seconds: u64) -> Result<bool, RepoError> {
        let now = self.clock.now();
        let window = i64::try_from(window_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let ends_at = now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut windows = self.windows.lock().await;
        windows.retain(|_, (_, end)| *end > now);
        let slot = windows.entry(key.to_string()).or_insert((0, ends_at));
        slot.0 += 1;
        Ok(slot.0 <= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use bejaia_shared::{ReservationDraft, ReservationKind};
    use chrono::TimeZone;

    fn entry(email: &str, n: usize) -> AttemptLogEntry {
        AttemptLogEntry {
            email: email.to_string(),
            phone: format!("055{:07}", n),
            full_name: "Amine Haddad".to_string(),
            timestamp: Utc::now(),
            success: true,
            reasons: vec![],
            fingerprint: format!("fp-{}", n),
        }
    }

    fn token(email: &str, value: &str) -> VerificationToken {
        let now = Utc::now();
        VerificationToken {
            token: value.to_string(),
            email: email.to_string(),
            reservation: ReservationDraft {
                full_name: "Amine Haddad".to_string(),
                email: email.to_string(),
                phone: "0551234567".to_string(),
                item_id: "kayak".to_string(),
                kind: ReservationKind::Activity,
                start_date: "2030-01-01".to_string(),
                participants: 2,
                price_per_participant: 1000.0,
                total_price: 2000.0,
                regimen: None,
                special_requests: None,
                age: None,
                address: None,
                status: ReservationStatus::Pending,
                created_at: now,
            },
            issued_at: now,
            expires_at: now + Duration::hours(24),
        }
    }

    #[tokio::test]
    async fn test_attempt_log_evicts_oldest_first() {
        let log = InMemoryAttemptLog::new(3);
        for n in 0..5 {
            log.append(&entry("a@example.com", n)).await.unwrap();
        }
        let recent = log.recent().await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].fingerprint, "fp-2");
        assert_eq!(recent[2].fingerprint, "fp-4");
    }

    #[tokio::test]
    async fn test_token_put_replaces_previous_for_same_email() {
        let repo = InMemoryTokenRepository::new();
        repo.put(&token("a@example.com", "first")).await.unwrap();
        repo.put(&token("a@example.com", "second")).await.unwrap();

        assert!(repo.find("first").await.unwrap().is_none());
        assert!(repo.find("second").await.unwrap().is_some());
        assert_eq!(repo.list().await.unwrap().len(), 1);

        assert!(repo.remove("second").await.unwrap());
        assert!(!repo.remove("second").await.unwrap());
    }

    #[tokio::test]
    async fn test_blocked_create_reports_conflict() {
        let repo = InMemoryBlockedDateRepository::new();
        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let b = BlockedDate::new("kayak".to_string(), date, None, Utc::now());
        assert!(repo.create(&b).await.unwrap());
        assert!(!repo.create(&b).await.unwrap());
        assert!(repo.delete("kayak", date).await.unwrap());
        assert!(!repo.delete("kayak", date).await.unwrap());
    }

    #[tokio::test]
    async fn test_rate_limiter_resets_after_window() {
        let start = Utc.with_ymd_and_hms(2029, 6, 1, 8, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let limiter = InMemoryRateLimiter::new(clock.clone());

        assert!(limiter.check("ip", 2, 60).await.unwrap());
        assert!(limiter.check("ip", 2, 60).await.unwrap());
        assert!(!limiter.check("ip", 2, 60).await.unwrap());
        assert!(limiter.check("other", 2, 60).await.unwrap());

        clock.advance(Duration::seconds(61));
        assert!(limiter.check("ip", 2, 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_rate_limiter_evicts_elapsed_windows() {
        let start = Utc.with_ymd_and_hms(2029, 6, 1, 8, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let limiter = InMemoryRateLimiter::new(clock.clone());

        for i in 0..10 {
            limiter.check(&format!("ip:10.0.0.{}", i), 5, 60).await.unwrap();
        }
        assert_eq!(limiter.tracked_keys().await, 10);

        clock.advance(Duration::seconds(60));
        assert!(limiter.check("ip:10.0.0.99", 5, 60).await.unwrap());
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_rate_limiter_accepts_huge_window() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2029, 6, 1, 8, 0, 0).unwrap()));
        let limiter = InMemoryRateLimiter::new(clock);

        assert!(limiter.check("ip", 1, u64::MAX).await.unwrap());
        assert!(!limiter.check("ip", 1, u64::MAX).await.unwrap());
    }
}
