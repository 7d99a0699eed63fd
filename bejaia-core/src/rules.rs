use serde::Deserialize;

/// Tunables for the admission pipeline. Loaded from the `admission` section
/// of the configuration and optionally overridden from the database.
#[derive(Debug, Deserialize, Clone)]
pub struct AdmissionRules {
    #[serde(default = "default_email_quota")]
    pub email_quota: usize,
    #[serde(default = "default_phone_daily_limit")]
    pub phone_daily_limit: usize,
    #[serde(default = "default_duplicate_window_seconds")]
    pub duplicate_window_seconds: i64,
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: i64,
    #[serde(default)]
    pub require_email_verification: bool,
    #[serde(default = "default_attempt_log_capacity")]
    pub attempt_log_capacity: usize,
    #[serde(default = "default_max_participants_warning")]
    pub max_participants_warning: i64,
    #[serde(default = "default_min_total_price")]
    pub min_total_price: f64,
    #[serde(default = "default_min_name_length")]
    pub min_name_length: usize,
    #[serde(default = "default_disposable_domains")]
    pub disposable_domains: Vec<String>,
}

fn default_email_quota() -> usize {
    5
}

fn default_phone_daily_limit() -> usize {
    5
}

fn default_duplicate_window_seconds() -> i64 {
    3600
}

fn default_token_ttl_seconds() -> i64 {
    86_400
}

fn default_attempt_log_capacity() -> usize {
    1000
}

fn default_max_participants_warning() -> i64 {
    20
}

fn default_min_total_price() -> f64 {
    500.0
}

fn default_min_name_length() -> usize {
    5
}

fn default_disposable_domains() -> Vec<String> {
    ["temp-mail.com", "10minutemail.com", "guerrillamail.com"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

impl Default for AdmissionRules {
    fn default() -> Self {
        Self {
            email_quota: default_email_quota(),
            phone_daily_limit: default_phone_daily_limit(),
            duplicate_window_seconds: default_duplicate_window_seconds(),
            token_ttl_seconds: default_token_ttl_seconds(),
            require_email_verification: false,
            attempt_log_capacity: default_attempt_log_capacity(),
            max_participants_warning: default_max_participants_warning(),
            min_total_price: default_min_total_price(),
            min_name_length: default_min_name_length(),
            disposable_domains: default_disposable_domains(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let rules: AdmissionRules =
            serde_json::from_str(r#"{"email_quota": 3, "require_email_verification": true}"#).unwrap();
        assert_eq!(rules.email_quota, 3);
        assert!(rules.require_email_verification);
        assert_eq!(rules.phone_daily_limit, 5);
        assert_eq!(rules.token_ttl_seconds, 86_400);
        assert_eq!(rules.disposable_domains.len(), 3);
    }
}
