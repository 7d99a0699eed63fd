pub mod app_config;
pub mod blocked_repo;
pub mod database;
#[cfg(feature = "kafka")]
pub mod events;
pub mod redis_repo;
pub mod reservation_repo;

pub use app_config::Config;
pub use blocked_repo::PgBlockedDateRepository;
pub use database::DbClient;
#[cfg(feature = "kafka")]
pub use events::EventProducer;
pub use redis_repo::RedisClient;
pub use reservation_repo::PgReservationRepository;
