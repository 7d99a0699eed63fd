//! Field validators for reservation requests.
//!
//! All checks are pure and total: malformed input fails validation, it
//! never panics or errors.

use bejaia_core::FieldError;
use bejaia_shared::ReservationDraft;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

use crate::sanitizer::unescape_html;

pub const MAX_EMAIL_LENGTH: usize = 100;
pub const MIN_NAME_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_PARTICIPANTS: i64 = 50;
pub const MAX_FREE_TEXT_LENGTH: usize = 500;

lazy_static! {
    /// local@domain.tld, no whitespace, exactly one @ boundary
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();

    /// Algerian numbers: +213 or a leading 0, then nine digits
    static ref PHONE_REGEX: Regex = Regex::new(r"^(\+213|0)[0-9]{9}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email) && email.chars().count() <= MAX_EMAIL_LENGTH
}

pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE_REGEX.is_match(&compact)
}

/// 3 to 50 characters once trimmed, starting with a letter of any script,
/// an apostrophe or a hyphen
pub fn is_valid_name(name: &str) -> bool {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) {
        return false;
    }
    trimmed
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '\'' || c == '-')
}

pub fn is_valid_participants(count: i64) -> bool {
    (1..=MAX_PARTICIPANTS).contains(&count)
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DDTHH:MM`
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}

/// Today is admissible, past dates are not
pub fn is_valid_date(value: &str, today: NaiveDate) -> bool {
    parse_date(value).is_some_and(|date| date >= today)
}

pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

pub fn is_valid_free_text(text: &str) -> bool {
    text.chars().count() <= MAX_FREE_TEXT_LENGTH
}

/// Runs every field check on a sanitized draft
pub fn validate_draft(draft: &ReservationDraft, today: NaiveDate) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if !is_valid_name(&draft.full_name) {
        errors.push(FieldError::new(
            "fullName",
            format!("must be {} to {} characters and start with a letter", MIN_NAME_LENGTH, MAX_NAME_LENGTH),
        ));
    }
    if !is_valid_email(&draft.email) {
        errors.push(FieldError::new("email", "invalid e-mail, expected example@domain.com"));
    }
    if !is_valid_phone(&draft.phone) {
        errors.push(FieldError::new("phone", "invalid phone, expected +213XXXXXXXXX or 0XXXXXXXXX"));
    }
    if draft.item_id.trim().is_empty() {
        errors.push(FieldError::new("itemId", "is required"));
    }
    if !is_valid_date(&draft.start_date, today) {
        errors.push(FieldError::new("startDate", "must be a valid date, today or later"));
    }
    if !is_valid_participants(draft.participants) {
        errors.push(FieldError::new(
            "participants",
            format!("must be between 1 and {}", MAX_PARTICIPANTS),
        ));
    }
    if !is_valid_price(draft.price_per_participant) {
        errors.push(FieldError::new("pricePerParticipant", "must be a positive number"));
    }
    // free text is stored escaped, the limit applies to what the visitor typed
    if let Some(text) = &draft.special_requests {
        if !is_valid_free_text(&unescape_html(text)) {
            errors.push(FieldError::new(
                "specialRequests",
                format!("must be at most {} characters", MAX_FREE_TEXT_LENGTH),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitizer::{sanitize, RawReservation};
    use bejaia_shared::{ReservationKind, ReservationStatus};
    use chrono::Utc;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2029, 6, 1).unwrap()
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("visitor@bejaia.dz"));
        assert!(is_valid_email("a.b+tag@mail.example.com"));
        assert!(!is_valid_email("visitor@bejaia"));
        assert!(!is_valid_email("visitor bejaia@mail.com"));
        assert!(!is_valid_email("@mail.com"));
        let long = format!("{}@example.com", "a".repeat(95));
        assert!(!is_valid_email(&long));
    }

    #[test]
    fn test_phone() {
        assert!(is_valid_phone("0551234567"));
        assert!(is_valid_phone("+213551234567"));
        assert!(is_valid_phone("055 123 45 67"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("+33551234567"));
        assert!(!is_valid_phone("05512345678"));
    }

    #[test]
    fn test_name() {
        assert!(is_valid_name("Amine"));
        assert!(is_valid_name("  Élodie Rahmani "));
        assert!(is_valid_name("'Abd al-Karim"));
        assert!(is_valid_name("أمين حداد"));
        assert!(!is_valid_name("Al"));
        assert!(!is_valid_name("3rd Guest"));
        assert!(!is_valid_name(&"a".repeat(51)));
    }

    #[test]
    fn test_participants_and_price() {
        assert!(is_valid_participants(1));
        assert!(is_valid_participants(50));
        assert!(!is_valid_participants(0));
        assert!(!is_valid_participants(51));
        assert!(is_valid_price(0.5));
        assert!(!is_valid_price(0.0));
        assert!(!is_valid_price(-3.0));
        assert!(!is_valid_price(f64::NAN));
    }

    #[test]
    fn test_date_admits_today_rejects_past() {
        assert!(is_valid_date("2029-06-01", today()));
        assert!(is_valid_date("2030-01-01T10:00:00Z", today()));
        assert!(is_valid_date("2029-06-02T09:30", today()));
        assert!(!is_valid_date("2029-05-31", today()));
        assert!(!is_valid_date("not a date", today()));
        assert!(!is_valid_date("2029-02-30", today()));
    }

    #[test]
    fn test_free_text() {
        assert!(is_valid_free_text(""));
        assert!(is_valid_free_text(&"x".repeat(500)));
        assert!(!is_valid_free_text(&"x".repeat(501)));
    }

    #[test]
    fn test_validate_draft_reports_each_bad_field() {
        let draft = ReservationDraft {
            full_name: "Al".to_string(),
            email: "nope".to_string(),
            phone: "0551234567".to_string(),
            item_id: String::new(),
            kind: ReservationKind::Activity,
            start_date: "2030-01-01".to_string(),
            participants: 2,
            price_per_participant: 0.0,
            total_price: 0.0,
            regimen: None,
            special_requests: None,
            age: None,
            address: None,
            status: ReservationStatus::Pending,
            created_at: Utc::now(),
        };

        let errors = validate_draft(&draft, today()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["fullName", "email", "itemId", "pricePerParticipant"]);
    }

    fn request_with_special_requests(text: &str) -> ReservationDraft {
        let raw: RawReservation = serde_json::from_value(json!({
            "fullName": "Amine Haddad",
            "email": "amine@mail.com",
            "phone": "0551234567",
            "destination": "kayak",
            "startDate": "2030-01-01",
            "participants": 2,
            "pricePerParticipant": 2500,
            "specialRequests": text
        }))
        .unwrap();
        sanitize(&raw, Utc::now())
    }

    #[test]
    fn test_free_text_limit_counts_characters_before_escaping() {
        let quoted = format!("{}{}", "a".repeat(400), "\"".repeat(100));
        let draft = request_with_special_requests(&quoted);
        assert!(draft.special_requests.as_ref().unwrap().len() > MAX_FREE_TEXT_LENGTH);
        assert_eq!(validate_draft(&draft, today()), Ok(()));

        let too_long = format!("{}{}", "a".repeat(400), "<".repeat(101));
        let errors = validate_draft(&request_with_special_requests(&too_long), today()).unwrap_err();
        assert_eq!(errors[0].field, "specialRequests");
    }
}
