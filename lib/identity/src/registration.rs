//! Registration: create a user, or hand an existing user a session.
//!
//! Registering an email that already exists is not an error. The caller gets
//! a valid session for the existing user, preferring the cached token when it
//! still verifies for that email.

use chrono::{DateTime, Utc};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::cache::SessionCache;
use crate::claims::SessionToken;
use crate::codec::SessionCodec;
use crate::directory::UserDirectory;
use crate::error::{DirectoryError, RegistrationError};
use crate::user::{Registration, User};

/// Whether registration created a user or found one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Created,
    AlreadyExists,
}

/// The session handed back by a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub outcome: RegistrationOutcome,
    /// The newly created user; `None` for `AlreadyExists`.
    pub user: Option<User>,
}

/// Registers users against a directory and a best-effort session cache.
#[derive(Clone)]
pub struct Registrar {
    directory: Arc<dyn UserDirectory>,
    cache: Arc<dyn SessionCache>,
    codec: Arc<SessionCodec>,
}

impl Registrar {
    #[must_use]
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        cache: Arc<dyn SessionCache>,
        codec: Arc<SessionCodec>,
    ) -> Self {
        Self {
            directory,
            cache,
            codec,
        }
    }

    /// Registers a user, or returns a session for the existing one.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the request fails validation
    /// - `NotFound` if the user vanished between duplicate detection and lookup
    /// - `InvariantViolation` if the directory holds more than one match
    /// - `StoreUnavailable` if the directory cannot be reached
    /// - `Signing` if no token can be issued
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: Registration,
    ) -> nowplaying_core::Result<RegisteredSession, RegistrationError> {
        registration.validate()?;

        let user = User::register(registration);
        match self.directory.create(&user).await {
            Ok(_) => {
                let token = self.issue_for(&user).await?;
                info!(user_id = %user.id(), "registered user");
                Ok(RegisteredSession {
                    expires_at: token.expires_at(),
                    token: token.into_string(),
                    outcome: RegistrationOutcome::Created,
                    user: Some(user),
                })
            }
            Err(DirectoryError::DuplicateIdentity { .. }) => {
                debug!("email already registered");
                self.existing_session(user.email()).await
            }
            Err(e) => {
                warn!(error = %e, "failed to create user");
                Err(RegistrationError::from_directory(user.email(), &e).into())
            }
        }
    }

    async fn existing_session(
        &self,
        email: &str,
    ) -> Result<RegisteredSession, Report<RegistrationError>> {
        if let Some(cached) = self.cached_session(email).await {
            return Ok(cached);
        }

        let user = self
            .directory
            .find_by_email(email)
            .await
            .map_err(|e| RegistrationError::from_directory(email, &e))?;
        let token = self.issue_for(&user).await?;

        Ok(RegisteredSession {
            expires_at: token.expires_at(),
            token: token.into_string(),
            outcome: RegistrationOutcome::AlreadyExists,
            user: None,
        })
    }

    /// Returns the cached session if it still verifies for `email`.
    async fn cached_session(&self, email: &str) -> Option<RegisteredSession> {
        let token = match self.cache.get(email).await {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "session cache lookup failed");
                return None;
            }
        };

        match self.codec.verify(&token) {
            Ok(claims) if claims.email() == email => {
                debug!("reusing cached session");
                Some(RegisteredSession {
                    expires_at: claims.expires_at(),
                    token,
                    outcome: RegistrationOutcome::AlreadyExists,
                    user: None,
                })
            }
            Ok(_) => {
                warn!("cached session belongs to another email");
                None
            }
            Err(e) => {
                debug!(error = %e, "cached session no longer valid");
                None
            }
        }
    }

    /// Issues a session for `user` and caches it for the validity window.
    async fn issue_for(&self, user: &User) -> Result<SessionToken, Report<RegistrationError>> {
        let token = self.codec.issue(&user.identity()).map_err(|e| {
            warn!(error = %e, "failed to issue session token");
            RegistrationError::Signing
        })?;

        let ttl = self.codec.validity().to_std().unwrap_or_default();
        if let Err(e) = self
            .cache
            .set_with_ttl(user.email(), token.as_str(), ttl)
            .await
        {
            warn!(error = %e, "failed to cache session token");
        }

        Ok(token)
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
