use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use bejaia_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::AppError,
    middleware::auth::{AdminClaims, ADMIN_ROLE},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub expires_in: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/admin", post(login_admin))
}

async fn login_admin(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.username != state.auth.admin_username || req.password != state.auth.admin_password {
        warn!("Rejected admin login for {}", Masked(&req.username));
        return Err(AppError::Authentication("Invalid credentials".to_string()));
    }

    // capped at one year
    let expiration = state.auth.expiration.min(31_536_000) as i64;
    let claims = AdminClaims {
        sub: req.username,
        role: ADMIN_ROLE.to_owned(),
        exp: (Utc::now() + Duration::seconds(expiration)).timestamp() as usize,
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(state.auth.secret.as_bytes()))
        .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))?;

    info!("Admin {} logged in", claims.sub);
    Ok(Json(AuthResponse { token, expires_in: state.auth.expiration }))
}
