use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps sensitive data so `Debug`/`Display` never print it. Serialization
/// keeps the real value since API responses need it.
#[derive(Clone, Deserialize)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// Log-friendly form of an e-mail: first character of the local part and
/// the domain, e.g. `a***@example.com`.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}

/// Keeps the last two digits of a phone number
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().collect();
    if digits.len() <= 2 {
        return "**".to_string();
    }
    let tail: String = digits[digits.len() - 2..].iter().collect();
    format!("{}{}", "*".repeat(digits.len() - 2), tail)
}

/// Keeps the first ten characters of a secret token, enough to correlate
/// log lines without making the token usable
pub fn mask_token(token: &str) -> String {
    let head: String = token.chars().take(10).collect();
    format!("{}***", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_logs() {
        let m = Masked("secret@example.com".to_string());
        assert_eq!(format!("{:?}", m), "********");
        assert_eq!(format!("{}", m), "********");
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"secret@example.com\"");
    }

    #[test]
    fn test_mask_email_and_phone() {
        assert_eq!(mask_email("amine@example.com"), "a***@example.com");
        assert_eq!(mask_email("broken"), "***");
        assert_eq!(mask_phone("0551234567"), "********67");
        assert_eq!(mask_phone("1"), "**");
    }

    #[test]
    fn test_mask_token_keeps_prefix_only() {
        let token = "verif_Ab3dEf6hIj9kLm2nOp5qRs8tUv1wXy4z";
        assert_eq!(mask_token(token), "verif_Ab3d***");
        assert!(!mask_token(token).contains("Ef6h"));
        assert_eq!(mask_token("abc"), "abc***");
    }
}
