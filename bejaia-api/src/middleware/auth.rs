use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub const ADMIN_ROLE: &str = "ADMIN";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Validates the bearer token of an admin request
pub fn authorize(headers: &HeaderMap, secret: &str) -> Result<AdminClaims, AppError> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Authentication("Expected a bearer token".to_string()))?;

    let token_data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))?;

    if token_data.claims.role != ADMIN_ROLE {
        return Err(AppError::Authentication("Admin role required".to_string()));
    }

    Ok(token_data.claims)
}

/// Guards every route of a router and exposes the claims as an extension
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = authorize(req.headers(), &state.auth.secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Per-handler guard for admin routes that share a path with public ones
impl FromRequestParts<AppState> for AdminClaims {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<AdminClaims>() {
            return Ok(claims.clone());
        }
        authorize(&parts.headers, &state.auth.secret)
    }
}
