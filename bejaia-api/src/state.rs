use bejaia_admission::{AdmissionPipeline, BlockedDateGuard, VerificationTokenStore};
use bejaia_core::memory::{
    InMemoryAttemptLog, InMemoryBlockedDateRepository, InMemoryRateLimiter, InMemoryReservationRepository,
    InMemoryTokenRepository,
};
use bejaia_core::repository::{AttemptLog, BlockedDateRepository, RateLimiter, ReservationRepository, TokenRepository};
use bejaia_core::{AdmissionRules, Clock, LogNotifier, Notifier};
use bejaia_reservation::ReservationManager;
use bejaia_store::app_config::RateLimitConfig;
use chrono::Duration;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub admin_username: String,
    pub admin_password: String,
}

/// Storage and delivery collaborators the service runs on
pub struct Backends {
    pub reservations: Arc<dyn ReservationRepository>,
    pub blocked_dates: Arc<dyn BlockedDateRepository>,
    pub attempts: Arc<dyn AttemptLog>,
    pub tokens: Arc<dyn TokenRepository>,
    pub limiter: Arc<dyn RateLimiter>,
    pub notifier: Arc<dyn Notifier>,
}

impl Backends {
    /// Process-local backends for development and tests
    pub fn in_memory(rules: &AdmissionRules, clock: Arc<dyn Clock>) -> Self {
        Self {
            reservations: Arc::new(InMemoryReservationRepository::new()),
            blocked_dates: Arc::new(InMemoryBlockedDateRepository::new()),
            attempts: Arc::new(InMemoryAttemptLog::new(rules.attempt_log_capacity)),
            tokens: Arc::new(InMemoryTokenRepository::new()),
            limiter: Arc::new(InMemoryRateLimiter::new(clock)),
            notifier: Arc::new(LogNotifier),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AdmissionPipeline>,
    pub manager: Arc<ReservationManager>,
    pub notifier: Arc<dyn Notifier>,
    pub limiter: Arc<dyn RateLimiter>,
    pub clock: Arc<dyn Clock>,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        rules: AdmissionRules,
        clock: Arc<dyn Clock>,
        backends: Backends,
        auth: AuthConfig,
        rate_limit: RateLimitConfig,
    ) -> Self {
        let tokens = Arc::new(VerificationTokenStore::new(
            backends.tokens,
            clock.clone(),
            Duration::seconds(rules.token_ttl_seconds),
        ));
        let blocked = Arc::new(BlockedDateGuard::new(backends.blocked_dates, clock.clone()));
        let manager = Arc::new(ReservationManager::new(backends.reservations.clone(), clock.clone()));
        let pipeline = Arc::new(AdmissionPipeline::new(
            rules,
            clock.clone(),
            backends.reservations,
            backends.attempts,
            tokens,
            blocked,
            backends.notifier.clone(),
        ));

        Self {
            pipeline,
            manager,
            notifier: backends.notifier,
            limiter: backends.limiter,
            clock,
            rate_limit,
            auth,
        }
    }
}
