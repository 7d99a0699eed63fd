//! Anti-abuse heuristics over the attempt history.
//!
//! Every check is a pure function of the candidate, the history slice and
//! `now`, so the pipeline decides when history is read and how it is locked.

use bejaia_core::{AdmissionRules, CoreError};
use bejaia_shared::{AttemptLogEntry, ReservationDraft};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Outcome of a counting check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaCheck {
    pub allowed: bool,
    pub count: usize,
    pub limit: usize,
    pub remaining: usize,
}

impl QuotaCheck {
    fn new(count: usize, limit: usize) -> Self {
        Self {
            allowed: count < limit,
            count,
            limit,
            remaining: limit.saturating_sub(count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    pub count: usize,
}

/// Non-blocking signals attached to an admitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyTag {
    DisposableEmail,
    ShortName,
    LargeGroup,
    LowPrice,
    PlusAddressing,
}

impl fmt::Display for AnomalyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AnomalyTag::DisposableEmail => "disposable e-mail domain",
            AnomalyTag::ShortName => "suspiciously short name",
            AnomalyTag::LargeGroup => "unusually large group",
            AnomalyTag::LowPrice => "suspiciously low total price",
            AnomalyTag::PlusAddressing => "e-mail uses plus addressing",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbuseReport {
    pub rejections: Vec<CoreError>,
    pub warnings: Vec<AnomalyTag>,
}

impl AbuseReport {
    pub fn is_clean(&self) -> bool {
        self.rejections.is_empty()
    }
}

pub struct AbuseDetector {
    rules: AdmissionRules,
}

impl AbuseDetector {
    pub fn new(rules: AdmissionRules) -> Self {
        Self { rules }
    }

    /// Successful reservations already made with this e-mail
    pub fn check_email_quota(&self, email: &str, history: &[AttemptLogEntry]) -> QuotaCheck {
        let count = history
            .iter()
            .filter(|e| e.success && e.email.eq_ignore_ascii_case(email))
            .count();
        QuotaCheck::new(count, self.rules.email_quota)
    }

    /// Attempts of any outcome from this phone on the current UTC day
    pub fn check_phone_rate_limit(
        &self,
        phone: &str,
        history: &[AttemptLogEntry],
        now: DateTime<Utc>,
    ) -> QuotaCheck {
        let today = now.date_naive();
        let count = history
            .iter()
            .filter(|e| e.phone == phone && e.timestamp.date_naive() == today)
            .count();
        QuotaCheck::new(count, self.rules.phone_daily_limit)
    }

    /// Successful entries inside the trailing window with the same e-mail,
    /// or with the same phone and name
    pub fn detect_duplicate(
        &self,
        candidate: &ReservationDraft,
        history: &[AttemptLogEntry],
        now: DateTime<Utc>,
    ) -> DuplicateCheck {
        let window = Duration::seconds(self.rules.duplicate_window_seconds);
        let count = history
            .iter()
            .filter(|e| e.success && now.signed_duration_since(e.timestamp) < window)
            .filter(|e| {
                e.email.eq_ignore_ascii_case(&candidate.email)
                    || (e.phone == candidate.phone && same_name(&e.full_name, &candidate.full_name))
            })
            .count();
        DuplicateCheck { is_duplicate: count > 0, count }
    }

    pub fn detect_anomalies(&self, candidate: &ReservationDraft) -> Vec<AnomalyTag> {
        let mut tags = Vec::new();

        let domain = candidate.email.rsplit_once('@').map(|(_, d)| d).unwrap_or_default();
        if self
            .rules
            .disposable_domains
            .iter()
            .any(|d| d.eq_ignore_ascii_case(domain))
        {
            tags.push(AnomalyTag::DisposableEmail);
        }
        if candidate.full_name.trim().chars().count() < self.rules.min_name_length {
            tags.push(AnomalyTag::ShortName);
        }
        if candidate.participants > self.rules.max_participants_warning {
            tags.push(AnomalyTag::LargeGroup);
        }
        if candidate.total_price > 0.0 && candidate.total_price < self.rules.min_total_price {
            tags.push(AnomalyTag::LowPrice);
        }
        if candidate.email.contains('+') {
            tags.push(AnomalyTag::PlusAddressing);
        }

        tags
    }

    /// Stable content hash of the identifying fields
    pub fn fingerprint(&self, candidate: &ReservationDraft) -> String {
        let mut hasher = Sha256::new();
        hasher.update(candidate.email.to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(candidate.phone.as_bytes());
        hasher.update(b"|");
        hasher.update(candidate.full_name.trim().to_lowercase().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn evaluate(
        &self,
        candidate: &ReservationDraft,
        history: &[AttemptLogEntry],
        now: DateTime<Utc>,
    ) -> AbuseReport {
        let mut rejections = Vec::new();

        let quota = self.check_email_quota(&candidate.email, history);
        if !quota.allowed {
            rejections.push(CoreError::QuotaExceeded { count: quota.count, limit: quota.limit });
        }

        let rate = self.check_phone_rate_limit(&candidate.phone, history, now);
        if !rate.allowed {
            rejections.push(CoreError::RateLimited { count: rate.count, limit: rate.limit });
        }

        let duplicate = self.detect_duplicate(candidate, history, now);
        if duplicate.is_duplicate {
            rejections.push(CoreError::Duplicate { count: duplicate.count });
        }

        AbuseReport { rejections, warnings: self.detect_anomalies(candidate) }
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bejaia_shared::{ReservationKind, ReservationStatus};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2029, 6, 1, 12, 0, 0).unwrap()
    }

    fn draft(email: &str, phone: &str, name: &str) -> ReservationDraft {
        ReservationDraft {
            full_name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
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
            created_at: now(),
        }
    }

    fn entry(email: &str, phone: &str, name: &str, at: DateTime<Utc>, success: bool) -> AttemptLogEntry {
        AttemptLogEntry {
            email: email.to_string(),
            phone: phone.to_string(),
            full_name: name.to_string(),
            timestamp: at,
            success,
            reasons: vec![],
            fingerprint: String::new(),
        }
    }

    #[test]
    fn test_email_quota_counts_successes_only() {
        let detector = AbuseDetector::new(AdmissionRules::default());
        let mut history: Vec<AttemptLogEntry> = (0..4)
            .map(|i| entry("A@mail.com", "0551234567", "Amine Haddad", now() - Duration::days(i), true))
            .collect();
        history.push(entry("a@mail.com", "0551234567", "Amine Haddad", now(), false));

        let check = detector.check_email_quota("a@mail.com", &history);
        assert_eq!(check, QuotaCheck { allowed: true, count: 4, limit: 5, remaining: 1 });

        history.push(entry("a@mail.com", "0551234567", "Amine Haddad", now(), true));
        assert!(!detector.check_email_quota("a@mail.com", &history).allowed);
    }

    #[test]
    fn test_phone_limit_counts_today_in_utc() {
        let detector = AbuseDetector::new(AdmissionRules::default());
        let midnight = Utc.with_ymd_and_hms(2029, 6, 1, 0, 0, 0).unwrap();
        let mut history = vec![entry("x@mail.com", "0551234567", "X", midnight - Duration::seconds(1), true)];
        for i in 0..4 {
            history.push(entry("x@mail.com", "0551234567", "X", midnight + Duration::minutes(i), i % 2 == 0));
        }

        let check = detector.check_phone_rate_limit("0551234567", &history, now());
        assert_eq!(check.count, 4);
        assert_eq!(check.remaining, 1);
        assert!(check.allowed);

        history.push(entry("y@mail.com", "0551234567", "Y", now(), false));
        let check = detector.check_phone_rate_limit("0551234567", &history, now());
        assert!(!check.allowed);
        assert_eq!(check.remaining, 0);
    }

    #[test]
    fn test_duplicate_window() {
        let detector = AbuseDetector::new(AdmissionRules::default());
        let candidate = draft("amine@mail.com", "0551234567", "Amine Haddad");

        let recent = vec![entry("AMINE@mail.com", "0660000000", "Other", now() - Duration::minutes(30), true)];
        assert!(detector.detect_duplicate(&candidate, &recent, now()).is_duplicate);

        let same_phone = vec![entry("other@mail.com", "0551234567", " amine haddad", now() - Duration::minutes(5), true)];
        assert!(detector.detect_duplicate(&candidate, &same_phone, now()).is_duplicate);

        let old = vec![entry("amine@mail.com", "0551234567", "Amine Haddad", now() - Duration::minutes(61), true)];
        assert!(!detector.detect_duplicate(&candidate, &old, now()).is_duplicate);

        let failed = vec![entry("amine@mail.com", "0551234567", "Amine Haddad", now(), false)];
        assert!(!detector.detect_duplicate(&candidate, &failed, now()).is_duplicate);
    }

    #[test]
    fn test_anomalies() {
        let detector = AbuseDetector::new(AdmissionRules::default());
        let mut candidate = draft("bot+1@temp-mail.com", "0551234567", "Bob");
        candidate.participants = 25;
        candidate.total_price = 300.0;

        assert_eq!(
            detector.detect_anomalies(&candidate),
            vec![
                AnomalyTag::DisposableEmail,
                AnomalyTag::ShortName,
                AnomalyTag::LargeGroup,
                AnomalyTag::LowPrice,
                AnomalyTag::PlusAddressing,
            ]
        );
        assert!(detector
            .detect_anomalies(&draft("amine@mail.com", "0551234567", "Amine Haddad"))
            .is_empty());
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let detector = AbuseDetector::new(AdmissionRules::default());
        let a = detector.fingerprint(&draft("Amine@mail.com", "0551234567", "Amine Haddad"));
        let b = detector.fingerprint(&draft("amine@mail.com", "0551234567", "amine haddad "));
        let c = detector.fingerprint(&draft("amine@mail.com", "0551234568", "Amine Haddad"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_evaluate_collects_every_rejection() {
        let rules = AdmissionRules { email_quota: 1, phone_daily_limit: 1, ..AdmissionRules::default() };
        let detector = AbuseDetector::new(rules);
        let history = vec![entry("amine@mail.com", "0551234567", "Amine Haddad", now(), true)];

        let report = detector.evaluate(&draft("amine@mail.com", "0551234567", "Amine Haddad"), &history, now());
        assert!(!report.is_clean());
        assert_eq!(
            report.rejections,
            vec![
                CoreError::QuotaExceeded { count: 1, limit: 1 },
                CoreError::RateLimited { count: 1, limit: 1 },
                CoreError::Duplicate { count: 1 },
            ]
        );
    }
}
