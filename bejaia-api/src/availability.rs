use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use bejaia_admission::sanitizer::clean_line;
use bejaia_admission::validator::parse_date;
use bejaia_shared::BlockedDate;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::middleware::AdminClaims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDateRequest {
    #[serde(alias = "nom_item", alias = "item_id")]
    pub item_id: String,
    pub date: String,
    #[serde(default)]
    pub reason: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/availability/{item}", get(list_blocked_dates))
        .route("/availability/block", post(block_date))
        .route("/availability/block/{item}/{date}", delete(unblock_date))
}

fn parse_day(value: &str) -> Result<NaiveDate, AppError> {
    parse_date(value).ok_or_else(|| AppError::BadRequest(format!("Invalid date: {}", value)))
}

fn parse_item(value: &str) -> Result<String, AppError> {
    let item = clean_line(value);
    if item.is_empty() {
        return Err(AppError::BadRequest("itemId is required".to_string()));
    }
    Ok(item)
}

async fn list_blocked_dates(
    State(state): State<AppState>,
    Path(item): Path<String>,
) -> Result<Json<Vec<BlockedDate>>, AppError> {
    let item = parse_item(&item)?;
    Ok(Json(state.pipeline.blocked_dates().list(&item).await?))
}

async fn block_date(
    admin: AdminClaims,
    State(state): State<AppState>,
    Json(req): Json<BlockDateRequest>,
) -> Result<(StatusCode, Json<BlockedDate>), AppError> {
    let item = parse_item(&req.item_id)?;
    let date = parse_day(&req.date)?;
    let blocked = state.pipeline.blocked_dates().block(&item, date, req.reason).await?;
    tracing::info!("{} blocked {} on {}", admin.sub, item, date);
    Ok((StatusCode::CREATED, Json(blocked)))
}

async fn unblock_date(
    _admin: AdminClaims,
    State(state): State<AppState>,
    Path((item, date)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let item = parse_item(&item)?;
    let date = parse_day(&date)?;
    state.pipeline.blocked_dates().unblock(&item, date).await?;
    Ok(Json(json!({ "itemId": item, "date": date, "unblocked": true })))
}
