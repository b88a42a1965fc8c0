//! The third-party "currently playing" resource.
//!
//! The payload shape belongs to the provider; it is carried through as an
//! opaque JSON value.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::UpstreamError;
use crate::http::{build_client, transport_reason};

/// Spotify's currently-playing endpoint.
pub const SPOTIFY_CURRENTLY_PLAYING_URL: &str =
    "https://api.spotify.com/v1/me/player/currently-playing";

/// What the user is doing right now.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentActivity {
    /// The provider's payload, verbatim.
    Playing(Value),
    /// Nothing is playing.
    Idle,
}

/// Result of one resource call.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityResponse {
    Activity(CurrentActivity),
    /// The provider answered 401: the access credential is no longer valid.
    Unauthorized,
}

/// Trait for the resource endpoint.
#[async_trait]
pub trait ActivityClient: Send + Sync {
    /// Fetches the current activity with `access_token`.
    ///
    /// An HTTP 401 is a normal response (`ActivityResponse::Unauthorized`),
    /// not an error.
    ///
    /// # Errors
    ///
    /// `UpstreamError::Unavailable` on transport failure, timeout, any other
    /// error status, or an unparseable body.
    async fn currently_playing(&self, access_token: &str)
    -> Result<ActivityResponse, UpstreamError>;
}

/// Resource client over HTTP with bearer authentication.
#[derive(Debug, Clone)]
pub struct HttpActivityClient {
    url: reqwest::Url,
    http_client: reqwest::Client,
}

impl HttpActivityClient {
    /// Creates a client for the endpoint at `url`.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::InvalidEndpoint` if `url` does not parse.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| UpstreamError::InvalidEndpoint {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            url: parsed,
            http_client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl ActivityClient for HttpActivityClient {
    #[instrument(skip_all)]
    async fn currently_playing(
        &self,
        access_token: &str,
    ) -> Result<ActivityResponse, UpstreamError> {
        let response = self
            .http_client
            .get(self.url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                let reason = transport_reason(&e);
                warn!(%reason, "activity request failed");
                UpstreamError::Unavailable { reason }
            })?;

        let status = response.status();
        debug!(%status, "activity response");

        match status {
            StatusCode::UNAUTHORIZED => return Ok(ActivityResponse::Unauthorized),
            StatusCode::NO_CONTENT | StatusCode::ACCEPTED => {
                return Ok(ActivityResponse::Activity(CurrentActivity::Idle));
            }
            s if !s.is_success() => {
                warn!(%status, "activity request returned error status");
                return Err(UpstreamError::Unavailable {
                    reason: format!("unexpected status {}", s.as_u16()),
                });
            }
            _ => {}
        }

        let body = response.bytes().await.map_err(|e| UpstreamError::Unavailable {
            reason: transport_reason(&e),
        })?;

        parse_activity(&body).map(ActivityResponse::Activity)
    }
}

/// Parses a success body: empty means idle, anything else must be JSON.
fn parse_activity(body: &[u8]) -> Result<CurrentActivity, UpstreamError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CurrentActivity::Idle);
    }

    serde_json::from_slice(body)
        .map(CurrentActivity::Playing)
        .map_err(|e| {
            warn!(error = %e, "activity body is not JSON");
            UpstreamError::Unavailable {
                reason: "unparseable activity body".to_string(),
            }
        })
}
