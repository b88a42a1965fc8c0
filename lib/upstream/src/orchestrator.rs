//! Proxy-with-refresh: fetch the caller's current activity, refreshing the
//! third-party access credential at most once.
//!
//! Per request the flow is:
//! 1. look up the caller by the email in their verified claims
//! 2. call the resource endpoint with the stored access credential
//! 3. on HTTP 401, refresh once, persist the new credential, and retry once
//!
//! A 401 on the retry, or a failed refresh, ends with `UpstreamAuth`.

use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use nowplaying_identity::{DirectoryError, SessionClaims, UserDirectory};

use crate::activity::{ActivityClient, ActivityResponse, CurrentActivity};
use crate::credential::CredentialPair;
use crate::error::ActivityError;
use crate::refresher::TokenRefresher;

/// Orchestrates the activity fetch for authenticated callers.
#[derive(Clone)]
pub struct ActivityOrchestrator {
    directory: Arc<dyn UserDirectory>,
    refresher: Arc<dyn TokenRefresher>,
    client: Arc<dyn ActivityClient>,
}

impl ActivityOrchestrator {
    #[must_use]
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        refresher: Arc<dyn TokenRefresher>,
        client: Arc<dyn ActivityClient>,
    ) -> Self {
        Self {
            directory,
            refresher,
            client,
        }
    }

    /// Returns what the caller identified by `claims` is playing.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the caller has no user record
    /// - `UpstreamAuth` if the provider refuses after one refresh, or the
    ///   refresh itself is rejected
    /// - `UpstreamUnavailable` on any transport failure or unusable answer
    /// - `StoreUnavailable` if the directory cannot be reached
    /// - `InvariantViolation` if the directory holds duplicate records
    #[instrument(skip(self, claims), fields(user_id = %claims.user_id()))]
    pub async fn current_activity(
        &self,
        claims: &SessionClaims,
    ) -> nowplaying_core::Result<CurrentActivity, ActivityError> {
        let email = claims.email();
        let user = self
            .directory
            .find_by_email(email)
            .await
            .map_err(|e| lookup_error(email, &e))?;
        let mut credentials = CredentialPair::of(&user);

        match self.fetch(credentials.access_token()).await? {
            ActivityResponse::Activity(activity) => return Ok(activity),
            ActivityResponse::Unauthorized => {
                debug!("access token rejected; refreshing");
            }
        }

        let access_token = self
            .refresher
            .refresh(credentials.refresh_token())
            .await
            .map_err(|e| ActivityError::from(&e))?;
        credentials.replace_access_token(access_token);
        self.persist(email, credentials.access_token()).await?;
        info!("refreshed access token");

        match self.fetch(credentials.access_token()).await? {
            ActivityResponse::Activity(activity) => Ok(activity),
            ActivityResponse::Unauthorized => {
                warn!("access token rejected after refresh");
                Err(ActivityError::UpstreamAuth.into())
            }
        }
    }

    async fn fetch(&self, access_token: &str) -> Result<ActivityResponse, Report<ActivityError>> {
        let response = self
            .client
            .currently_playing(access_token)
            .await
            .map_err(|e| ActivityError::from(&e))?;
        Ok(response)
    }

    /// Stores the refreshed credential. A vanished user does not stop the
    /// retry; an unreachable store does.
    async fn persist(&self, email: &str, access_token: &str) -> Result<(), Report<ActivityError>> {
        match self.directory.update_access_token(email, access_token).await {
            Ok(()) => Ok(()),
            Err(DirectoryError::NotFound { .. }) => {
                warn!("user vanished before refreshed token could be stored");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to store refreshed token");
                Err(lookup_error(email, &e).into())
            }
        }
    }
}

fn lookup_error(email: &str, error: &DirectoryError) -> ActivityError {
    match error {
        DirectoryError::NotFound { .. } => ActivityError::UserNotFound {
            email: email.to_string(),
        },
        DirectoryError::StoreUnavailable { .. } => ActivityError::StoreUnavailable,
        DirectoryError::DuplicateIdentity { .. } | DirectoryError::InvariantViolation { .. } => {
            ActivityError::InvariantViolation {
                email: email.to_string(),
            }
        }
    }
}

impl std::fmt::Debug for ActivityOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityOrchestrator").finish_non_exhaustive()
    }
}
