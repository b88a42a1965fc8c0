//! Session claims carried by first-party session tokens.
//!
//! A session token is created after registration (or a session refresh) and
//! is presented on every protected request. Its claims are the only
//! per-request identity the server trusts.

use chrono::{DateTime, TimeZone, Utc};
use nowplaying_core::UserId;
use serde::{Deserialize, Serialize};

/// The identity a session token vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
}

/// Verified claims of a session token.
///
/// Handlers receive these through the request extensions after the gate has
/// verified the token; they are never built from unverified input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user's ID.
    sub: UserId,
    username: String,
    email: String,
    /// Issuer.
    iss: String,
    /// Issued at (Unix seconds).
    iat: i64,
    /// Expiration time (Unix seconds).
    exp: i64,
}

impl SessionClaims {
    /// Builds claims for `identity` valid from `issued_at` until `expires_at`.
    #[must_use]
    pub fn new(
        identity: &Identity,
        issuer: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: identity.user_id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            iss: issuer.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.sub
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.iss
    }

    /// Returns when the token expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Returns the identity these claims vouch for.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// A freshly signed session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    token: String,
    claims: SessionClaims,
}

impl SessionToken {
    pub(crate) fn new(token: String, claims: SessionClaims) -> Self {
        Self { token, claims }
    }

    /// Returns the encoded token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Returns the claims that were signed.
    #[must_use]
    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    /// Returns when the token expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }

    /// Consumes the token, returning the encoded string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity() -> Identity {
        Identity {
            user_id: UserId::new(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
        }
    }

    #[test]
    fn claims_round_trip_identity() {
        let identity = identity();
        let now = Utc::now();
        let claims = SessionClaims::new(&identity, "nowplaying", now, now + Duration::hours(1));

        assert_eq!(claims.identity(), identity);
        assert_eq!(claims.issuer(), "nowplaying");
        assert_eq!(claims.user_id(), identity.user_id);
    }

    #[test]
    fn expires_at_truncates_to_seconds() {
        let now = Utc::now();
        let expires = now + Duration::minutes(60);
        let claims = SessionClaims::new(&identity(), "nowplaying", now, expires);

        assert_eq!(claims.expires_at().timestamp(), expires.timestamp());
    }

    #[test]
    fn claims_serialize_with_registered_names() {
        let now = Utc::now();
        let claims = SessionClaims::new(&identity(), "nowplaying", now, now + Duration::hours(1));
        let json = serde_json::to_value(&claims).expect("serialize");

        for key in ["sub", "username", "email", "iss", "iat", "exp"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
