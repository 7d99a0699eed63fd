use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use bejaia_admission::{AdmissionDecision, RawReservation};
use bejaia_shared::Reservation;
use uuid::Uuid;

use crate::error::{status_for, AppError};
use crate::middleware::AdminClaims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reservations", post(submit_reservation).get(list_reservations))
        .route("/reservations/{id}", get(get_reservation))
        .route("/reservations/{id}/accept", put(accept_reservation))
        .route("/reservations/{id}/refuse", put(refuse_reservation))
}

/// 201 when stored, 202 when waiting for e-mail verification, the status of
/// the first rejection otherwise
fn decision_status(decision: &AdmissionDecision) -> StatusCode {
    if decision.verification_pending {
        StatusCode::ACCEPTED
    } else if decision.admitted {
        StatusCode::CREATED
    } else {
        decision
            .rejections
            .first()
            .map(status_for)
            .unwrap_or(StatusCode::BAD_REQUEST)
    }
}

async fn submit_reservation(
    State(state): State<AppState>,
    Json(raw): Json<RawReservation>,
) -> Result<(StatusCode, Json<AdmissionDecision>), AppError> {
    let decision = state.pipeline.submit(&raw).await?;
    Ok((decision_status(&decision), Json(decision)))
}

async fn list_reservations(
    _admin: AdminClaims,
    State(state): State<AppState>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    Ok(Json(state.manager.list().await?))
}

async fn get_reservation(
    _admin: AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.manager.get(id).await?))
}

async fn accept_reservation(
    admin: AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = state.manager.accept(id).await?;
    tracing::info!("Reservation {} accepted by {}", id, admin.sub);
    Ok(Json(reservation))
}

async fn refuse_reservation(
    admin: AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = state.manager.refuse(id).await?;
    tracing::info!("Reservation {} refused by {}", id, admin.sub);
    Ok(Json(reservation))
}
