//! HS256 signing and verification of session tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::claims::{Identity, SessionClaims, SessionToken};
use crate::error::SessionError;

/// Default session validity window.
pub const DEFAULT_SESSION_MINUTES: i64 = 60;

/// Signs and verifies session tokens with a shared secret.
///
/// Stateless: every method is a pure function of its input, the secret, the
/// issuer, and the current time.
#[derive(Clone)]
pub struct SessionCodec {
    secret: Option<String>,
    issuer: String,
    validity: Duration,
}

impl SessionCodec {
    /// Creates a codec.
    ///
    /// An absent or empty `secret` is accepted here; issuing then fails with
    /// `SessionError::Signing` and every token fails verification.
    #[must_use]
    pub fn new(secret: Option<String>, issuer: impl Into<String>, validity: Duration) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            issuer: issuer.into(),
            validity,
        }
    }

    /// Returns the validity window of issued tokens.
    #[must_use]
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issues a token for `identity`, valid from now for the validity window.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Signing` if the secret is unavailable, the
    /// expiry is out of range, or encoding fails.
    pub fn issue(&self, identity: &Identity) -> Result<SessionToken, SessionError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.validity)
            .filter(|expires_at| *expires_at > now)
            .ok_or_else(|| SessionError::Signing {
                reason: "session validity out of range".to_string(),
            })?;
        let claims = SessionClaims::new(identity, &self.issuer, now, expires_at);
        let token = self.sign(&claims)?;
        Ok(SessionToken::new(token, claims))
    }

    /// Issues a new token for the identity carried by verified `claims`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Signing` if the secret is unavailable.
    pub fn reissue(&self, claims: &SessionClaims) -> Result<SessionToken, SessionError> {
        self.issue(&claims.identity())
    }

    /// Verifies `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidToken` if the signature does not match,
    /// the token is malformed, the issuer differs, or the token has expired.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let secret = self.secret.as_deref().ok_or_else(|| SessionError::InvalidToken {
            reason: "no signing secret configured".to_string(),
        })?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| SessionError::InvalidToken {
            reason: match e.kind() {
                ErrorKind::ExpiredSignature => "token has expired".to_string(),
                ErrorKind::InvalidSignature => "signature mismatch".to_string(),
                ErrorKind::InvalidIssuer => "unexpected issuer".to_string(),
                _ => e.to_string(),
            },
        })
    }

    pub(crate) fn sign(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        let secret = self.secret.as_deref().ok_or_else(|| SessionError::Signing {
            reason: "no signing secret configured".to_string(),
        })?;

        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| SessionError::Signing {
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("validity", &self.validity)
            .finish()
    }
}
