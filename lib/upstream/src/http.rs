//! Shared outbound HTTP client construction.

use std::time::Duration;

use crate::error::UpstreamError;

/// Default bound on every outbound request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds a reqwest client with redirects disabled and a request timeout.
///
/// Redirects are disabled so a token endpoint cannot bounce credentials to
/// another host.
///
/// # Errors
///
/// Returns `UpstreamError::Unavailable` if the TLS backend fails to
/// initialize.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
        .map_err(|e| UpstreamError::Unavailable {
            reason: format!("HTTP client error: {e}"),
        })
}

/// Describes a transport failure without echoing URLs or bodies.
pub(crate) fn transport_reason(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else {
        "request failed".to_string()
    }
}
