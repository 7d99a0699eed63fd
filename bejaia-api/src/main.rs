use anyhow::Context;
use bejaia_api::{
    app,
    state::{AppState, AuthConfig, Backends},
};
use bejaia_core::{Clock, SystemClock};
use bejaia_store::{Config, DbClient, PgBlockedDateRepository, PgReservationRepository, RedisClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bejaia_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting VisitBejaia API on port {}", config.server.port);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut rules = config.admission.clone();
    let mut backends = Backends::in_memory(&rules, clock.clone());

    // Postgres
    if let Some(database) = &config.database {
        let db = DbClient::new(&database.url)
            .await
            .context("Failed to connect to Postgres")?;
        db.migrate().await.context("Failed to run migrations")?;
        rules = db
            .fetch_admission_rules(rules)
            .await
            .context("Failed to load admission rules")?;
        backends.reservations = Arc::new(PgReservationRepository::new(db.pool.clone()));
        backends.blocked_dates = Arc::new(PgBlockedDateRepository::new(db.pool.clone()));
        tracing::info!("Reservations stored in Postgres");
    } else {
        tracing::warn!("No database configured, reservations are kept in memory");
    }

    // Redis
    if let Some(redis) = &config.redis {
        let redis_client = RedisClient::new(&redis.url)
            .await
            .context("Failed to create Redis client")?
            .with_attempt_capacity(rules.attempt_log_capacity);
        redis_client.ping().await.context("Failed to connect to Redis")?;
        let redis_arc = Arc::new(redis_client);
        backends.attempts = redis_arc.clone();
        backends.tokens = redis_arc.clone();
        backends.limiter = redis_arc;
        tracing::info!("Attempt log, tokens and rate limits stored in Redis");
    }

    // Kafka
    #[cfg(feature = "kafka")]
    if let Some(kafka) = &config.kafka {
        let producer = bejaia_store::EventProducer::new(kafka).context("Failed to create Kafka producer")?;
        backends.notifier = Arc::new(producer);
        tracing::info!("Notifications published to Kafka at {}", kafka.brokers);
    }
    #[cfg(not(feature = "kafka"))]
    if config.kafka.is_some() {
        tracing::warn!("Kafka is configured but this build has no `kafka` feature, notifications are only logged");
    }

    let app_state = AppState::new(
        rules,
        clock,
        backends,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            admin_username: config.auth.admin_username.clone(),
            admin_password: config.auth.admin_password.clone(),
        },
        config.rate_limit.clone(),
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
