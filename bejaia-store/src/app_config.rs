use bejaia_core::AdmissionRules;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Without a database the service keeps reservations in memory
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub kafka: Option<KafkaConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub admission: AdmissionRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
    pub admin_username: String,
    pub admin_password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_verification_topic")]
    pub verification_topic: String,
    #[serde(default = "default_contact_topic")]
    pub contact_topic: String,
}

fn default_verification_topic() -> String {
    "reservation.verification_requested".to_string()
}

fn default_contact_topic() -> String {
    "site.contact_message".to_string()
}

/// Per-IP request budget of the HTTP service
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests: u64,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests: 100, window_seconds: 60 }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `BEJAIA_AUTH__JWT_SECRET=...`
            .add_source(config::Environment::with_prefix("BEJAIA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
