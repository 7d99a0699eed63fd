use bejaia_core::AdmissionRules;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    rule_key: String,
    rule_value: Value,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlays the rows of `admission_rules` on `defaults`
    pub async fn fetch_admission_rules(&self, defaults: AdmissionRules) -> Result<AdmissionRules, sqlx::Error> {
        let rows = sqlx::query_as::<_, RuleRow>("SELECT rule_key, rule_value FROM admission_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = defaults;
        for row in rows {
            // Expected format: {"value": <number/bool/array>}
            match row.rule_value.get("value") {
                Some(v) => {
                    if !apply_rule(&mut rules, &row.rule_key, v) {
                        warn!("Ignoring admission rule {} with value {}", row.rule_key, v);
                    }
                }
                None => warn!("Admission rule {} has no \"value\" field", row.rule_key),
            }
        }

        Ok(rules)
    }
}

/// Returns `false` when the key is unknown or the value has the wrong type
fn apply_rule(rules: &mut AdmissionRules, key: &str, v: &Value) -> bool {
    let as_usize = |v: &Value| v.as_u64().and_then(|u| usize::try_from(u).ok());
    match key {
        "email_quota" => as_usize(v).map(|u| rules.email_quota = u).is_some(),
        "phone_daily_limit" => as_usize(v).map(|u| rules.phone_daily_limit = u).is_some(),
        "attempt_log_capacity" => as_usize(v).map(|u| rules.attempt_log_capacity = u).is_some(),
        "min_name_length" => as_usize(v).map(|u| rules.min_name_length = u).is_some(),
        "duplicate_window_seconds" => v.as_i64().map(|i| rules.duplicate_window_seconds = i).is_some(),
        "token_ttl_seconds" => v.as_i64().map(|i| rules.token_ttl_seconds = i).is_some(),
        "max_participants_warning" => v.as_i64().map(|i| rules.max_participants_warning = i).is_some(),
        "min_total_price" => v.as_f64().map(|f| rules.min_total_price = f).is_some(),
        "require_email_verification" => v.as_bool().map(|b| rules.require_email_verification = b).is_some(),
        "disposable_domains" => match v.as_array() {
            Some(items) => {
                rules.disposable_domains = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|d| d.to_lowercase())
                    .collect();
                true
            }
            None => false,
        },
        _ => false,
    }
}
