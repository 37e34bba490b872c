use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use pepperpot_types::api::Claims;

use crate::error::ApiError;

/// `axum::Json` with rejections reported in the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Set on every request by the `authenticate` middleware. `None` for
/// anonymous callers and for tokens that fail validation.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<Claims>);

/// A signed-in caller. Rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> String {
        self.0.sub.to_string()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>() {
            Some(Viewer(Some(claims))) => Ok(Self(claims.clone())),
            _ => Err(ApiError::Unauthenticated),
        }
    }
}

/// The caller if signed in. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Claims>);

impl MaybeUser {
    pub fn id(&self) -> Option<String> {
        self.0.as_ref().map(|c| c.sub.to_string())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Viewer>()
            .and_then(|viewer| viewer.0.clone());
        Ok(Self(claims))
    }
}
