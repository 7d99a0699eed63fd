//! Normalization of raw reservation submissions.
//!
//! `sanitize` is total: unparsable numbers fall back to safe defaults
//! (1 participant, price 0) and are then caught by validation. Applying it
//! twice gives the same draft as applying it once.

use bejaia_shared::{ReservationDraft, ReservationKind, ReservationStatus};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

lazy_static! {
    static ref HTML_TAG_PATTERN: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref MULTI_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Reservation form payload as posted by the site. Field names of both the
/// current forms and the legacy french ones are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReservation {
    #[serde(default, alias = "full_name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default, alias = "mail")]
    pub email: Option<String>,
    #[serde(default, alias = "telephone")]
    pub phone: Option<String>,
    #[serde(default, alias = "destination", alias = "nom_item", alias = "item_id")]
    pub item_id: Option<String>,
    #[serde(default, alias = "date_depart", alias = "start_date")]
    pub start_date: Option<String>,
    #[serde(default, alias = "nb_personnes")]
    pub participants: Option<Value>,
    #[serde(default, alias = "prix", alias = "price", alias = "price_per_participant")]
    pub price_per_participant: Option<Value>,
    #[serde(default)]
    pub regimen: Option<String>,
    #[serde(default, alias = "special_requests")]
    pub special_requests: Option<String>,
    #[serde(default, rename = "type", alias = "type_reservation")]
    pub kind: Option<String>,
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default, alias = "adresse")]
    pub address: Option<String>,
}

impl From<&ReservationDraft> for RawReservation {
    fn from(draft: &ReservationDraft) -> Self {
        Self {
            full_name: Some(draft.full_name.clone()),
            nom: None,
            prenom: None,
            email: Some(draft.email.clone()),
            phone: Some(draft.phone.clone()),
            item_id: Some(draft.item_id.clone()),
            start_date: Some(draft.start_date.clone()),
            participants: Some(Value::from(draft.participants)),
            price_per_participant: Some(Value::from(draft.price_per_participant)),
            regimen: draft.regimen.clone(),
            special_requests: draft.special_requests.clone(),
            kind: Some(draft.kind.as_str().to_string()),
            age: draft.age.map(Value::from),
            address: draft.address.clone(),
        }
    }
}

pub fn sanitize(raw: &RawReservation, now: DateTime<Utc>) -> ReservationDraft {
    let full_name = match raw.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => clean_line(name),
        None => {
            let joined = format!(
                "{} {}",
                raw.nom.as_deref().unwrap_or_default(),
                raw.prenom.as_deref().unwrap_or_default()
            );
            clean_line(&joined)
        }
    };

    let participants = raw.participants.as_ref().and_then(coerce_int).unwrap_or(1);
    let price_per_participant = raw.price_per_participant.as_ref().and_then(coerce_float).unwrap_or(0.0);
    let total_price = participants as f64 * price_per_participant;

    ReservationDraft {
        full_name,
        email: raw.email.as_deref().unwrap_or_default().trim().to_lowercase(),
        phone: raw
            .phone
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect(),
        item_id: clean_line(raw.item_id.as_deref().unwrap_or_default()),
        kind: raw
            .kind
            .as_deref()
            .and_then(ReservationKind::from_label)
            .unwrap_or_default(),
        start_date: raw.start_date.as_deref().unwrap_or_default().trim().to_string(),
        participants,
        price_per_participant,
        total_price,
        regimen: free_text(raw.regimen.as_deref()),
        special_requests: free_text(raw.special_requests.as_deref()),
        age: raw
            .age
            .as_ref()
            .and_then(coerce_int)
            .and_then(|a| i32::try_from(a).ok()),
        address: free_text(raw.address.as_deref()),
        status: ReservationStatus::Pending,
        created_at: now,
    }
}

/// Single-line field: control characters and markup removed, whitespace collapsed
pub fn clean_line(value: &str) -> String {
    let no_control: String = value.chars().filter(|c| !c.is_control()).collect();
    let no_html = HTML_TAG_PATTERN.replace_all(&no_control, "");
    MULTI_WHITESPACE.replace_all(no_html.trim(), " ").to_string()
}

fn free_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(escape_html)
}

/// HTML-escapes `value`. Entities already present are decoded first so the
/// result never gets double-escaped.
pub fn escape_html(value: &str) -> String {
    let decoded = unescape_html(value);
    let mut out = String::with_capacity(decoded.len());
    for c in decoded.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

const ENTITIES: [(&str, char); 6] = [
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&#x27;", '\''),
    ("&#39;", '\''),
];

pub fn unescape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, decoded)) => {
                out.push(*decoded);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Integer coercion in the spirit of `parseInt`: leading digits win,
/// decimals are truncated
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => leading_int(s),
        _ => None,
    }
}

fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}
