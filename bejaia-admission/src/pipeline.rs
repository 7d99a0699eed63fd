use bejaia_core::repository::{AttemptLog, ReservationRepository};
use bejaia_core::{AdmissionRules, Clock, CoreError, CoreResult, FieldError, Notifier};
use bejaia_shared::pii::{mask_email, mask_phone};
use bejaia_shared::{AttemptLogEntry, Reservation, ReservationDraft};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, warn};

use crate::abuse::AbuseDetector;
use crate::blocked::BlockedDateGuard;
use crate::locks::KeyedLocks;
use crate::sanitizer::{sanitize, RawReservation};
use crate::tokens::VerificationTokenStore;
use crate::validator::{parse_date, validate_draft};

/// Result of a submission. Rejections are data, not errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionDecision {
    pub admitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
    pub verification_pending: bool,
    pub rejections: Vec<CoreError>,
    /// Human readable form of `rejections`
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl AdmissionDecision {
    fn admitted(reservation: Reservation, warnings: Vec<String>) -> Self {
        Self {
            admitted: true,
            reservation: Some(reservation),
            verification_pending: false,
            rejections: vec![],
            errors: vec![],
            warnings,
        }
    }

    fn verification_pending(warnings: Vec<String>) -> Self {
        Self {
            admitted: true,
            reservation: None,
            verification_pending: true,
            rejections: vec![],
            errors: vec![],
            warnings,
        }
    }

    fn rejected(rejections: Vec<CoreError>, warnings: Vec<String>) -> Self {
        Self {
            admitted: false,
            reservation: None,
            verification_pending: false,
            errors: rejections.iter().flat_map(messages).collect(),
            rejections,
            warnings,
        }
    }
}

fn messages(rejection: &CoreError) -> Vec<String> {
    match rejection {
        CoreError::Validation { errors } => errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect(),
        other => vec![other.to_string()],
    }
}

/// Runs a raw submission through sanitization, validation, the blocked
/// date check and the abuse heuristics, then persists it or parks it
/// behind a verification token.
pub struct AdmissionPipeline {
    rules: AdmissionRules,
    clock: Arc<dyn Clock>,
    detector: AbuseDetector,
    reservations: Arc<dyn ReservationRepository>,
    attempts: Arc<dyn AttemptLog>,
    tokens: Arc<VerificationTokenStore>,
    blocked: Arc<BlockedDateGuard>,
    notifier: Arc<dyn Notifier>,
    /// Per e-mail and per phone locks around the history read and append
    identities: KeyedLocks,
}

impl AdmissionPipeline {
    pub fn new(
        rules: AdmissionRules,
        clock: Arc<dyn Clock>,
        reservations: Arc<dyn ReservationRepository>,
        attempts: Arc<dyn AttemptLog>,
        tokens: Arc<VerificationTokenStore>,
        blocked: Arc<BlockedDateGuard>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            detector: AbuseDetector::new(rules.clone()),
            rules,
            clock,
            reservations,
            attempts,
            tokens,
            blocked,
            notifier,
            identities: KeyedLocks::new(),
        }
    }

    pub fn blocked_dates(&self) -> &Arc<BlockedDateGuard> {
        &self.blocked
    }

    pub fn tokens(&self) -> &Arc<VerificationTokenStore> {
        &self.tokens
    }

    pub async fn submit(&self, raw: &RawReservation) -> CoreResult<AdmissionDecision> {
        let now = self.clock.now();
        let draft = sanitize(raw, now);

        let date = match validate_draft(&draft, now.date_naive()).and_then(|_| start_date(&draft)) {
            Ok(date) => date,
            Err(errors) => {
                return Ok(self.reject(&draft, now, vec![CoreError::Validation { errors }], vec![]).await);
            }
        };

        // identity locks first, then the slot; confirm and block only take the slot
        let identity = self.lock_identity(&draft).await;
        let slot = self.blocked.lock(&draft.item_id, date).await;
        let result = self.admit_locked(draft, date, now).await;
        drop(slot);
        drop(identity);
        self.blocked.prune_locks();
        self.identities.prune();
        result
    }

    async fn lock_identity(&self, draft: &ReservationDraft) -> [OwnedMutexGuard<()>; 2] {
        let email = self.identities.lock(&format!("email:{}", draft.email.to_lowercase())).await;
        let phone = self.identities.lock(&format!("phone:{}", draft.phone)).await;
        [email, phone]
    }

    async fn admit_locked(
        &self,
        draft: ReservationDraft,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> CoreResult<AdmissionDecision> {
        if self.blocked.is_blocked(&draft.item_id, date).await? {
            let rejection = CoreError::BlockedDate { item_id: draft.item_id.clone(), date };
            return Ok(self.reject(&draft, now, vec![rejection], vec![]).await);
        }

        let history = self.attempts.recent().await.map_err(CoreError::storage)?;
        let report = self.detector.evaluate(&draft, &history, now);
        let warnings: Vec<String> = report.warnings.iter().map(ToString::to_string).collect();
        if !report.is_clean() {
            return Ok(self.reject(&draft, now, report.rejections, warnings).await);
        }

        let needs_verification =
            self.rules.require_email_verification && !self.tokens.is_verified(&draft.email).await?;

        if needs_verification {
            let token = match self.tokens.issue(draft.clone()).await {
                Ok(token) => token,
                Err(e) => {
                    self.record_attempt(&draft, now, false, vec![e.to_string()]).await;
                    return Err(e);
                }
            };
            if let Err(e) = self.notifier.verification_requested(&draft.email, &token.token).await {
                warn!("Failed to send verification e-mail to {}: {}", mask_email(&draft.email), e);
            }
            self.record_attempt(&draft, now, true, vec![]).await;
            info!("Reservation for {} on {} awaiting e-mail verification", draft.item_id, date);
            return Ok(AdmissionDecision::verification_pending(warnings));
        }

        let reservation = Reservation::from_draft(draft.clone(), date);
        if let Err(e) = self.reservations.create(&reservation).await {
            error!("Failed to persist reservation for {} on {}: {}", draft.item_id, date, e);
            let err = CoreError::storage(e);
            self.record_attempt(&draft, now, false, vec![err.to_string()]).await;
            return Err(err);
        }

        self.record_attempt(&draft, now, true, vec![]).await;
        info!("Reservation {} admitted for {} on {}", reservation.id, reservation.item_id, date);
        Ok(AdmissionDecision::admitted(reservation, warnings))
    }

    /// Persists the draft carried by a verification token
    pub async fn confirm(&self, token: &str) -> CoreResult<Reservation> {
        let mut draft = self.tokens.redeem(token).await?;
        let date = start_date(&draft).map_err(|errors| CoreError::Validation { errors })?;
        draft.created_at = self.clock.now();

        let result = {
            let _guard = self.blocked.lock(&draft.item_id, date).await;
            self.persist_confirmed(draft, date).await
        };
        self.blocked.prune_locks();
        result
    }

    async fn persist_confirmed(&self, draft: ReservationDraft, date: NaiveDate) -> CoreResult<Reservation> {
        if self.blocked.is_blocked(&draft.item_id, date).await? {
            warn!("Verified reservation for {} hit blocked date {}", draft.item_id, date);
            return Err(CoreError::BlockedDate { item_id: draft.item_id, date });
        }

        let reservation = Reservation::from_draft(draft, date);
        self.reservations.create(&reservation).await.map_err(|e| {
            error!("Failed to persist verified reservation: {}", e);
            CoreError::storage(e)
        })?;
        info!("Reservation {} admitted after e-mail verification", reservation.id);
        Ok(reservation)
    }

    async fn reject(
        &self,
        draft: &ReservationDraft,
        now: DateTime<Utc>,
        rejections: Vec<CoreError>,
        warnings: Vec<String>,
    ) -> AdmissionDecision {
        let decision = AdmissionDecision::rejected(rejections, warnings);
        warn!(
            "Reservation rejected for {} / {}: {}",
            mask_email(&draft.email),
            mask_phone(&draft.phone),
            decision.errors.join("; ")
        );
        self.record_attempt(draft, now, false, decision.errors.clone()).await;
        decision
    }

    /// Best-effort: a failing attempt log never changes the decision
    async fn record_attempt(&self, draft: &ReservationDraft, now: DateTime<Utc>, success: bool, reasons: Vec<String>) {
        let entry = AttemptLogEntry {
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            full_name: draft.full_name.clone(),
            timestamp: now,
            success,
            reasons,
            fingerprint: self.detector.fingerprint(draft),
        };
        if let Err(e) = self.attempts.append(&entry).await {
            warn!("Failed to record reservation attempt: {}", e);
        }
    }
}

fn start_date(draft: &ReservationDraft) -> Result<NaiveDate, Vec<FieldError>> {
    parse_date(&draft.start_date).ok_or_else(|| vec![FieldError::new("startDate", "must be a valid date")])
}
