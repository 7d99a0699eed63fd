use bejaia_core::repository::TokenRepository;
use bejaia_core::{Clock, CoreError, CoreResult};
use bejaia_shared::{ReservationDraft, VerificationToken};
use chrono::Duration;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

pub const TOKEN_PREFIX: &str = "verif_";
const TOKEN_RANDOM_LENGTH: usize = 32;

/// Issues and redeems single-use e-mail verification tokens
pub struct VerificationTokenStore {
    repo: Arc<dyn TokenRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl VerificationTokenStore {
    pub fn new(repo: Arc<dyn TokenRepository>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { repo, clock, ttl }
    }

    /// Stores `draft` behind a fresh token. An outstanding token for the
    /// same e-mail is replaced.
    pub async fn issue(&self, draft: ReservationDraft) -> CoreResult<VerificationToken> {
        let issued_at = self.clock.now();
        let token = VerificationToken {
            token: generate_token(),
            email: draft.email.clone(),
            reservation: draft,
            issued_at,
            expires_at: issued_at + self.ttl,
        };
        self.repo.put(&token).await.map_err(CoreError::storage)?;
        debug!("Issued verification token expiring at {}", token.expires_at);
        Ok(token)
    }

    /// Consumes `token` and returns the draft it carried. Expired tokens are
    /// left in place.
    pub async fn redeem(&self, token: &str) -> CoreResult<ReservationDraft> {
        let entry = self
            .repo
            .find(token)
            .await
            .map_err(CoreError::storage)?
            .ok_or(CoreError::TokenNotFound)?;

        if entry.is_expired_at(self.clock.now()) {
            return Err(CoreError::TokenExpired);
        }

        // Lost the race against a concurrent redemption
        if !self.repo.remove(token).await.map_err(CoreError::storage)? {
            return Err(CoreError::TokenNotFound);
        }

        self.repo.mark_verified(&entry.email).await.map_err(CoreError::storage)?;
        info!("Verification token redeemed");
        Ok(entry.reservation)
    }

    pub async fn list_pending(&self) -> CoreResult<Vec<VerificationToken>> {
        self.repo.list().await.map_err(CoreError::storage)
    }

    pub async fn is_verified(&self, email: &str) -> CoreResult<bool> {
        self.repo.is_verified(email).await.map_err(CoreError::storage)
    }
}

fn generate_token() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_RANDOM_LENGTH)
        .map(char::from)
        .collect();
    format!("{}{}", TOKEN_PREFIX, random)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bejaia_core::memory::InMemoryTokenRepository;
    use bejaia_core::ManualClock;
    use bejaia_shared::{ReservationKind, ReservationStatus};
    use chrono::{DateTime, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2029, 6, 1, 9, 0, 0).unwrap()
    }

    fn draft(email: &str) -> ReservationDraft {
        ReservationDraft {
            full_name: "Amine Haddad".to_string(),
            email: email.to_string(),
            phone: "0551234567".to_string(),
            item_id: "kayak".to_string(),
            kind: ReservationKind::Activity,
            start_date: "2030-01-01".to_string(),
            participants: 2,
            price_per_participant: 2500.0,
            total_price: 5000.0,
            regimen: None,
            special_requests: None,
            age: None,
            address: None,
            status: ReservationStatus::Pending,
            created_at: start(),
        }
    }

    fn store() -> (VerificationTokenStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let store = VerificationTokenStore::new(
            Arc::new(InMemoryTokenRepository::new()),
            clock.clone(),
            Duration::hours(24),
        );
        (store, clock)
    }

    #[test]
    fn test_token_format() {
        let token = generate_token();
        assert!(token.starts_with(TOKEN_PREFIX));
        let random = &token[TOKEN_PREFIX.len()..];
        assert_eq!(random.len(), TOKEN_RANDOM_LENGTH);
        assert!(random.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_token(), token);
    }

    #[tokio::test]
    async fn test_redeem_is_single_use() {
        let (store, _) = store();
        let token = store.issue(draft("amine@mail.com")).await.unwrap();
        assert_eq!(token.expires_at, start() + Duration::hours(24));
        assert!(!store.is_verified("amine@mail.com").await.unwrap());

        let redeemed = store.redeem(&token.token).await.unwrap();
        assert_eq!(redeemed, draft("amine@mail.com"));
        assert!(store.is_verified("amine@mail.com").await.unwrap());

        assert_eq!(store.redeem(&token.token).await, Err(CoreError::TokenNotFound));
    }

    #[tokio::test]
    async fn test_expired_token_is_kept() {
        let (store, clock) = store();
        let token = store.issue(draft("amine@mail.com")).await.unwrap();

        clock.advance(Duration::hours(24));
        assert_eq!(store.redeem(&token.token).await, Err(CoreError::TokenExpired));
        assert_eq!(store.list_pending().await.unwrap().len(), 1);
        assert!(!store.is_verified("amine@mail.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_reissue_replaces_previous_token() {
        let (store, _) = store();
        let first = store.issue(draft("amine@mail.com")).await.unwrap();
        let second = store.issue(draft("amine@mail.com")).await.unwrap();
        store.issue(draft("sara@mail.com")).await.unwrap();

        assert_eq!(store.list_pending().await.unwrap().len(), 2);
        assert_eq!(store.redeem(&first.token).await, Err(CoreError::TokenNotFound));
        assert!(store.redeem(&second.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (store, _) = store();
        assert_eq!(store.redeem("verif_nope").await, Err(CoreError::TokenNotFound));
    }
}
