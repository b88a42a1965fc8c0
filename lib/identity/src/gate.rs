//! Request authorization: bearer extraction and session verification.
//!
//! The web layer calls [`authorize`] with the raw `Authorization` header
//! before any protected operation touches the store or the upstream.

use crate::claims::SessionClaims;
use crate::codec::SessionCodec;
use crate::error::SessionError;

/// Extracts the token from an `Authorization: <scheme> <token>` header.
///
/// The scheme is not checked; only the presence of two whitespace-separated
/// parts is.
///
/// # Errors
///
/// Returns `SessionError::MissingCredential` if the header is absent or has
/// no non-empty second part.
pub fn bearer_token(header: Option<&str>) -> Result<&str, SessionError> {
    let mut parts = header
        .ok_or(SessionError::MissingCredential)?
        .split_whitespace();

    let _scheme = parts.next().ok_or(SessionError::MissingCredential)?;
    match parts.next() {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(SessionError::MissingCredential),
    }
}

/// Verifies the session credential carried by an `Authorization` header.
///
/// # Errors
///
/// Returns `SessionError::MissingCredential` for an absent or malformed
/// header, or `SessionError::InvalidToken` if verification fails.
pub fn authorize(codec: &SessionCodec, header: Option<&str>) -> Result<SessionClaims, SessionError> {
    let token = bearer_token(header)?;
    codec.verify(token)
}
