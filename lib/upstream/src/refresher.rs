//! Exchange of a stored refresh credential for a new access credential.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, RequestTokenError, TokenResponse, TokenUrl};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::UpstreamError;
use crate::http::{build_client, transport_reason};

/// Spotify's token endpoint.
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Trait for third-party token refresh.
///
/// One call is one outbound request; implementations never retry.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Returns a new access credential for `refresh_token`.
    ///
    /// # Errors
    ///
    /// `UpstreamError::Auth` if the provider rejects the grant or answers
    /// with an unusable body; `UpstreamError::Unavailable` on transport
    /// failure or timeout.
    async fn refresh(&self, refresh_token: &str) -> Result<String, UpstreamError>;
}

/// Refresher using the OAuth 2.0 `refresh_token` grant.
///
/// The client credentials are sent as HTTP Basic auth.
#[derive(Clone)]
pub struct OAuthTokenRefresher {
    client_id: String,
    client_secret: String,
    token_url: TokenUrl,
    http_client: reqwest::Client,
}

impl OAuthTokenRefresher {
    /// Creates a refresher for the given client and token endpoint.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::InvalidEndpoint` if `token_url` is not a valid
    /// URL.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let token_url =
            TokenUrl::new(token_url.to_string()).map_err(|e| UpstreamError::InvalidEndpoint {
                url: token_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url,
            http_client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl TokenRefresher for OAuthTokenRefresher {
    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<String, UpstreamError> {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_token_uri(self.token_url.clone());

        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| match e {
                RequestTokenError::Request(e) => {
                    let reason = match &e {
                        oauth2::HttpClientError::Reqwest(inner) => transport_reason(inner),
                        other => other.to_string(),
                    };
                    warn!(%reason, "token refresh request failed");
                    UpstreamError::Unavailable { reason }
                }
                RequestTokenError::ServerResponse(response) => {
                    warn!(error = %response.error(), "token refresh rejected");
                    UpstreamError::Auth {
                        reason: response.error().to_string(),
                    }
                }
                RequestTokenError::Parse(_, _) => {
                    warn!("token refresh response could not be parsed");
                    UpstreamError::Auth {
                        reason: "unparseable token response".to_string(),
                    }
                }
                RequestTokenError::Other(reason) => {
                    warn!(%reason, "token refresh failed");
                    UpstreamError::Auth { reason }
                }
            })?;

        if response.refresh_token().is_some() {
            debug!("provider rotated the refresh token; keeping the stored one");
        }

        Ok(response.access_token().secret().clone())
    }
}

impl std::fmt::Debug for OAuthTokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokenRefresher")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url.as_str())
            .finish_non_exhaustive()
    }
}
