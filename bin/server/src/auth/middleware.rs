//! Session gate middleware and extractor for Axum.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use nowplaying_identity::{SessionClaims, SessionError, authorize};
use std::sync::Arc;
use tracing::debug;

use super::AppState;
use crate::error::ApiError;

/// Rejects requests without a valid session token.
///
/// On success the verified claims are stored in the request extensions for
/// [`CurrentSession`]. A header that is not valid UTF-8 counts as missing.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let claims = authorize(&state.codec, header).map_err(|e| {
        debug!(error = %e, "rejected request");
        ApiError::from(&e)
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Extractor for the verified session of the current request.
///
/// Fails closed with 401 if the gate did not run.
pub struct CurrentSession(pub SessionClaims);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionClaims>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| ApiError::from(&SessionError::MissingCredential))
    }
}
