use async_trait::async_trait;
use bejaia_core::repository::{BlockedDateRepository, RepoError};
use bejaia_shared::BlockedDate;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

pub struct PgBlockedDateRepository {
    pool: PgPool,
}

impl PgBlockedDateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BlockedDateRow {
    item_id: String,
    date: NaiveDate,
    reason: String,
    created_at: DateTime<Utc>,
}

impl From<BlockedDateRow> for BlockedDate {
    fn from(row: BlockedDateRow) -> Self {
        BlockedDate {
            item_id: row.item_id,
            date: row.date,
            reason: row.reason,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl BlockedDateRepository for PgBlockedDateRepository {
    async fn list(&self, item_id: &str) -> Result<Vec<BlockedDate>, RepoError> {
        let rows = sqlx::query_as::<_, BlockedDateRow>(
            "SELECT item_id, date, reason, created_at FROM blocked_dates WHERE item_id = $1 ORDER BY date ASC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(BlockedDate::from).collect())
    }

    async fn create(&self, blocked: &BlockedDate) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO blocked_dates (item_id, date, reason, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (item_id, date) DO NOTHING
            "#,
        )
        .bind(&blocked.item_id)
        .bind(blocked.date)
        .bind(&blocked.reason)
        .bind(blocked.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_one(&self, item_id: &str, date: NaiveDate) -> Result<Option<BlockedDate>, RepoError> {
        let row = sqlx::query_as::<_, BlockedDateRow>(
            "SELECT item_id, date, reason, created_at FROM blocked_dates WHERE item_id = $1 AND date = $2",
        )
        .bind(item_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(BlockedDate::from))
    }

    async fn delete(&self, item_id: &str, date: NaiveDate) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM blocked_dates WHERE item_id = $1 AND date = $2")
            .bind(item_id)
            .bind(date)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
