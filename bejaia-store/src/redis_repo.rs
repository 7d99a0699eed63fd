use async_trait::async_trait;
use bejaia_core::repository::{AttemptLog, RateLimiter, RepoError, TokenRepository};
use bejaia_shared::{AttemptLogEntry, VerificationToken};
use redis::AsyncCommands;
use tracing::{debug, warn};

const ATTEMPT_LOG_KEY: &str = "attempts:log";
const TOKEN_INDEX_KEY: &str = "verification:tokens";
const VERIFIED_EMAILS_KEY: &str = "verification:verified_emails";
const TOKEN_KEY_PREFIX: &str = "verification:token:";

fn token_key(token: &str) -> String {
    format!("{}{}", TOKEN_KEY_PREFIX, token)
}

fn email_key(email: &str) -> String {
    format!("verification:email:{}", email.to_lowercase())
}

fn rate_limit_key(key: &str) -> String {
    format!("ratelimit:{}", key)
}

/// Replaces the outstanding token of an e-mail in one step.
/// KEYS: token key, e-mail key, index. ARGV: payload, token, token key prefix.
const PUT_TOKEN_SCRIPT: &str = r#"
    local previous = redis.call("GET", KEYS[2])
    if previous then
        redis.call("DEL", ARGV[3] .. previous)
        redis.call("SREM", KEYS[3], previous)
    end
    redis.call("SET", KEYS[1], ARGV[1])
    redis.call("SET", KEYS[2], ARGV[2])
    redis.call("SADD", KEYS[3], ARGV[2])
    return 1
"#;

/// Compare-and-delete. KEYS: token key, index, e-mail key. ARGV: token.
const REMOVE_TOKEN_SCRIPT: &str = r#"
    if redis.call("DEL", KEYS[1]) == 0 then
        return 0
    end
    redis.call("SREM", KEYS[2], ARGV[1])
    if redis.call("GET", KEYS[3]) == ARGV[1] then
        redis.call("DEL", KEYS[3])
    end
    return 1
"#;

/// Redis-backed attempt log, token store and request limiter
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
    attempt_capacity: usize,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client, attempt_capacity: 1000 })
    }

    pub fn with_attempt_capacity(mut self, capacity: usize) -> Self {
        self.attempt_capacity = capacity.max(1);
        self
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl AttemptLog for RedisClient {
    async fn append(&self, entry: &AttemptLogEntry) -> Result<(), RepoError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(entry)?;
        let keep = isize::try_from(self.attempt_capacity).unwrap_or(isize::MAX);

        // RPUSH + LTRIM in one MULTI so the list never exceeds capacity
        redis::pipe()
            .atomic()
            .rpush(ATTEMPT_LOG_KEY, payload)
            .ignore()
            .ltrim(ATTEMPT_LOG_KEY, -keep, -1)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn recent(&self) -> Result<Vec<AttemptLogEntry>, RepoError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Vec<String> = conn.lrange(ATTEMPT_LOG_KEY, 0, -1).await?;
        Ok(parse_entries(raw))
    }
}

fn parse_entries(raw: Vec<String>) -> Vec<AttemptLogEntry> {
    raw.into_iter()
        .filter_map(|item| match serde_json::from_str(&item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping malformed attempt log entry: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl TokenRepository for RedisClient {
    async fn put(&self, token: &VerificationToken) -> Result<(), RepoError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(token)?;
        redis::Script::new(PUT_TOKEN_SCRIPT)
            .key(token_key(&token.token))
            .key(email_key(&token.email))
            .key(TOKEN_INDEX_KEY)
            .arg(payload)
            .arg(&token.token)
            .arg(TOKEN_KEY_PREFIX)
            .invoke_async::<i64>(&mut conn)
            .await?;
        debug!("Stored verification token, expires at {}", token.expires_at);
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<VerificationToken>, RepoError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(token_key(token)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, token: &str) -> Result<bool, RepoError> {
        let Some(entry) = self.find(token).await? else {
            return Ok(false);
        };
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let removed: i64 = redis::Script::new(REMOVE_TOKEN_SCRIPT)
            .key(token_key(token))
            .key(TOKEN_INDEX_KEY)
            .key(email_key(&entry.email))
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }

    async fn list(&self) -> Result<Vec<VerificationToken>, RepoError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let tokens: Vec<String> = conn.smembers(TOKEN_INDEX_KEY).await?;
        if tokens.is_empty() {
            return Ok(vec![]);
        }

        let keys: Vec<String> = tokens.iter().map(|t| token_key(t)).collect();
        let payloads: Vec<Option<String>> = conn.mget(keys).await?;
        let mut all = payloads
            .into_iter()
            .flatten()
            .map(|json| serde_json::from_str::<VerificationToken>(&json))
            .collect::<Result<Vec<_>, _>>()?;
        all.sort_by(|a, b| a.issued_at.cmp(&b.issued_at));
        Ok(all)
    }

    async fn mark_verified(&self, email: &str) -> Result<(), RepoError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.sadd::<_, _, ()>(VERIFIED_EMAILS_KEY, email.to_lowercase()).await?;
        Ok(())
    }

    async fn is_verified(&self, email: &str) -> Result<bool, RepoError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let verified: bool = conn.sismember(VERIFIED_EMAILS_KEY, email.to_lowercase()).await?;
        Ok(verified)
    }
}

#[async_trait]
impl RateLimiter for RedisClient {
    async fn check(&self, key: &str, limit: u64, window_seconds: u64) -> Result<bool, RepoError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = rate_limit_key(key);

        // EXPIRE NX keeps the window fixed from the first hit
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .cmd("EXPIRE")
            .arg(&key)
            .arg(window_seconds)
            .arg("NX")
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}
