use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bejaia_shared::Reservation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingVerification {
    pub token: String,
    pub email: String,
    pub item_id: String,
    pub start_date: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/reservations/verify", get(verify_reservation))
}

/// Mounted behind the admin middleware
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/verifications", get(list_pending))
}

async fn verify_reservation(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let reservation = state.pipeline.confirm(query.token.trim()).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

async fn list_pending(State(state): State<AppState>) -> Result<Json<Vec<PendingVerification>>, AppError> {
    let now = state.clock.now();
    let pending = state
        .pipeline
        .tokens()
        .list_pending()
        .await?
        .into_iter()
        .map(|t| PendingVerification {
            expired: t.is_expired_at(now),
            item_id: t.reservation.item_id,
            start_date: t.reservation.start_date,
            token: t.token,
            email: t.email,
            issued_at: t.issued_at,
            expires_at: t.expires_at,
        })
        .collect();
    Ok(Json(pending))
}
