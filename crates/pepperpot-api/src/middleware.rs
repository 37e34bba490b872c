use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use pepperpot_types::api::Claims;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::extract::Viewer;
use crate::state::AppState;

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!("Rejected bearer token: {}", e);
            None
        }
    }
}

/// Resolves the bearer token, if any, into a `Viewer` extension. Routes that
/// need a signed-in user reject through the `AuthUser` extractor.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = bearer_token(req.headers()).and_then(|token| decode_token(&state.jwt_secret, token));
    req.extensions_mut().insert(Viewer(claims));
    next.run(req).await
}

/// First `x-forwarded-for` hop, else the peer address, else `unknown`.
pub fn client_key(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn limit_tts(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&req);
    if !state.tts_limiter.check(&key) {
        warn!(client = %key, "Speech rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}
