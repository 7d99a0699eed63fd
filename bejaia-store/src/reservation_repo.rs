use async_trait::async_trait;
use bejaia_core::repository::{RepoError, ReservationRepository};
use bejaia_shared::{Reservation, ReservationKind, ReservationStatus};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_COLUMNS: &str = "id, full_name, email, phone, item_id, kind, start_date, participants, \
     price_per_participant, total_price, regimen, special_requests, age, address, status, created_at, updated_at";

pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    full_name: String,
    email: String,
    phone: String,
    item_id: String,
    kind: String,
    start_date: NaiveDate,
    participants: i32,
    price_per_participant: f64,
    total_price: f64,
    regimen: Option<String>,
    special_requests: Option<String>,
    age: Option<i32>,
    address: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = RepoError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let status: ReservationStatus = row.status.parse()?;
        let kind = ReservationKind::from_label(&row.kind)
            .ok_or_else(|| format!("unknown reservation kind: {}", row.kind))?;
        Ok(Reservation {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            item_id: row.item_id,
            kind,
            start_date: row.start_date,
            participants: row.participants,
            price_per_participant: row.price_per_participant,
            total_price: row.total_price,
            regimen: row.regimen,
            special_requests: row.special_requests,
            age: row.age,
            address: row.address,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn create(&self, r: &Reservation) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, full_name, email, phone, item_id, kind, start_date, participants,
                price_per_participant, total_price, regimen, special_requests, age, address,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(r.id)
        .bind(&r.full_name)
        .bind(&r.email)
        .bind(&r.phone)
        .bind(&r.item_id)
        .bind(r.kind.as_str())
        .bind(r.start_date)
        .bind(r.participants)
        .bind(r.price_per_participant)
        .bind(r.total_price)
        .bind(&r.regimen)
        .bind(&r.special_requests)
        .bind(r.age)
        .bind(&r.address)
        .bind(r.status.as_str())
        .bind(r.created_at)
        .bind(r.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Reservation>, RepoError> {
        let sql = format!("SELECT {} FROM reservations ORDER BY created_at DESC", SELECT_COLUMNS);
        let rows = sqlx::query_as::<_, ReservationRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Reservation>, RepoError> {
        let sql = format!("SELECT {} FROM reservations WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Reservation::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Reservation>, RepoError> {
        // Compare-and-set: only the caller that still sees `from` wins
        let sql = format!(
            "UPDATE reservations SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, ReservationRow>(&sql)
            .bind(to.as_str())
            .bind(at)
            .bind(id)
            .bind(from.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Reservation::try_from).transpose()
    }
}
