use bejaia_core::repository::ReservationRepository;
use bejaia_core::{Clock, CoreError, CoreResult};
use bejaia_shared::{Reservation, ReservationStatus};
use std::sync::Arc;
use uuid::Uuid;

/// Admin-side view of reservations: listing and the status transitions.
///
/// Only `pending` reservations can move. Accepted and refused are terminal;
/// asking to move out of them, even to the same status, is an invalid
/// transition and leaves the record untouched.
pub struct ReservationManager {
    repo: Arc<dyn ReservationRepository>,
    clock: Arc<dyn Clock>,
}

impl ReservationManager {
    pub fn new(repo: Arc<dyn ReservationRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// All reservations, newest first
    pub async fn list(&self) -> CoreResult<Vec<Reservation>> {
        self.repo.list().await.map_err(CoreError::storage)
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Reservation> {
        self.repo
            .get(id)
            .await
            .map_err(CoreError::storage)?
            .ok_or_else(|| CoreError::not_found(format!("Reservation {}", id)))
    }

    /// Transition: Pending → Accepted
    pub async fn accept(&self, id: Uuid) -> CoreResult<Reservation> {
        self.transition(id, ReservationStatus::Accepted).await
    }

    /// Transition: Pending → Refused
    pub async fn refuse(&self, id: Uuid) -> CoreResult<Reservation> {
        self.transition(id, ReservationStatus::Refused).await
    }

    async fn transition(&self, id: Uuid, to: ReservationStatus) -> CoreResult<Reservation> {
        let current = self.get(id).await?;

        if current.status != ReservationStatus::Pending {
            return Err(CoreError::InvalidTransition { from: current.status, to });
        }

        let updated = self
            .repo
            .update_status(id, ReservationStatus::Pending, to, self.clock.now())
            .await
            .map_err(CoreError::storage)?;

        match updated {
            Some(reservation) => {
                tracing::info!("Reservation {} moved to {}", id, to);
                Ok(reservation)
            }
            None => {
                // Lost a race with another admin action; report what won
                let winner = self.get(id).await?;
                Err(CoreError::InvalidTransition { from: winner.status, to })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bejaia_core::memory::InMemoryReservationRepository;
    use bejaia_core::repository::RepoError;
    use bejaia_core::ManualClock;
    use bejaia_shared::{ReservationDraft, ReservationKind};
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2029, 6, 1, 9, 0, 0).unwrap()
    }

    fn reservation(created_at: DateTime<Utc>) -> Reservation {
        let draft = ReservationDraft {
            full_name: "Lina Boudjema".to_string(),
            email: "lina@example.com".to_string(),
            phone: "0551234567".to_string(),
            item_id: "gouraya".to_string(),
            kind: ReservationKind::Destination,
            start_date: "2030-01-01".to_string(),
            participants: 2,
            price_per_participant: 3000.0,
            total_price: 6000.0,
            regimen: None,
            special_requests: None,
            age: None,
            address: None,
            status: ReservationStatus::Pending,
            created_at,
        };
        Reservation::from_draft(draft, NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
    }

    async fn setup() -> (ReservationManager, Arc<InMemoryReservationRepository>, Arc<ManualClock>) {
        let repo = Arc::new(InMemoryReservationRepository::new());
        let clock = Arc::new(ManualClock::new(start()));
        let manager = ReservationManager::new(repo.clone(), clock.clone());
        (manager, repo, clock)
    }

    #[tokio::test]
    async fn test_accept_pending_reservation() {
        let (manager, repo, clock) = setup().await;
        let r = reservation(start());
        repo.create(&r).await.unwrap();

        clock.advance(Duration::minutes(5));
        let accepted = manager.accept(r.id).await.unwrap();
        assert_eq!(accepted.status, ReservationStatus::Accepted);
        assert_eq!(accepted.updated_at, start() + Duration::minutes(5));
        assert_eq!(manager.get(r.id).await.unwrap().status, ReservationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_accept_after_refuse_is_invalid_and_keeps_status() {
        let (manager, repo, _) = setup().await;
        let r = reservation(start());
        repo.create(&r).await.unwrap();

        manager.refuse(r.id).await.unwrap();
        let err = manager.accept(r.id).await.unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidTransition { from: ReservationStatus::Refused, to: ReservationStatus::Accepted }
        );
        assert_eq!(manager.get(r.id).await.unwrap().status, ReservationStatus::Refused);
    }

    #[tokio::test]
    async fn test_repeating_terminal_status_is_invalid() {
        let (manager, repo, _) = setup().await;
        let r = reservation(start());
        repo.create(&r).await.unwrap();

        manager.accept(r.id).await.unwrap();
        assert!(matches!(manager.accept(r.id).await, Err(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (manager, _, _) = setup().await;
        assert!(matches!(manager.accept(Uuid::new_v4()).await, Err(CoreError::NotFound { .. })));
        assert!(matches!(manager.refuse(Uuid::new_v4()).await, Err(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (manager, repo, _) = setup().await;
        let older = reservation(start());
        let newer = reservation(start() + Duration::hours(1));
        repo.create(&older).await.unwrap();
        repo.create(&newer).await.unwrap();

        let list = manager.list().await.unwrap();
        assert_eq!(list[0].id, newer.id);
        assert_eq!(list[1].id, older.id);
    }

    struct BrokenRepository;

    #[async_trait::async_trait]
    impl ReservationRepository for BrokenRepository {
        async fn create(&self, _: &Reservation) -> Result<(), RepoError> {
            Err("connection refused".into())
        }
        async fn list(&self) -> Result<Vec<Reservation>, RepoError> {
            Err("connection refused".into())
        }
        async fn get(&self, _: Uuid) -> Result<Option<Reservation>, RepoError> {
            Err("connection refused".into())
        }
        async fn update_status(
            &self,
            _: Uuid,
            _: ReservationStatus,
            _: ReservationStatus,
            _: DateTime<Utc>,
        ) -> Result<Option<Reservation>, RepoError> {
            Err("connection refused".into())
        }
    }

    #[tokio::test]
    async fn test_storage_failures_surface_as_storage_errors() {
        let manager = ReservationManager::new(Arc::new(BrokenRepository), Arc::new(ManualClock::new(start())));
        assert!(matches!(manager.list().await, Err(CoreError::Storage { .. })));
        assert!(matches!(manager.accept(Uuid::new_v4()).await, Err(CoreError::Storage { .. })));
    }
}
