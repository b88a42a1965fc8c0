//! Error types for the upstream crate.
//!
//! - `UpstreamError`: failures of a single outbound call (token refresh or
//!   activity fetch)
//! - `ActivityError`: high-level outcome of the proxy-with-refresh flow,
//!   the context of reports returned by the orchestrator

use std::fmt;

/// Errors from a single call to the third-party service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The provider rejected the credentials or returned an unusable grant.
    Auth { reason: String },
    /// The provider could not be reached, timed out, or answered unusably.
    Unavailable { reason: String },
    /// A configured endpoint is not a valid URL.
    InvalidEndpoint { url: String, reason: String },
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth { reason } => write!(f, "upstream rejected credentials: {reason}"),
            Self::Unavailable { reason } => write!(f, "upstream unavailable: {reason}"),
            Self::InvalidEndpoint { url, reason } => {
                write!(f, "invalid upstream endpoint '{url}': {reason}")
            }
        }
    }
}

impl std::error::Error for UpstreamError {}

/// Outcome of fetching the caller's current activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityError {
    /// The verified caller has no user record.
    UserNotFound { email: String },
    /// The provider still refuses after the one permitted refresh.
    UpstreamAuth,
    /// The provider could not be reached or answered unusably.
    UpstreamUnavailable,
    /// The user store could not be reached.
    StoreUnavailable,
    /// The user store holds inconsistent data for the caller.
    InvariantViolation { email: String },
}

impl fmt::Display for ActivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserNotFound { email } => write!(f, "no user registered for '{email}'"),
            Self::UpstreamAuth => write!(f, "upstream authorization failed after refresh"),
            Self::UpstreamUnavailable => write!(f, "upstream unavailable"),
            Self::StoreUnavailable => write!(f, "user store unavailable"),
            Self::InvariantViolation { email } => {
                write!(f, "inconsistent directory state for '{email}'")
            }
        }
    }
}

impl std::error::Error for ActivityError {}

impl From<&UpstreamError> for ActivityError {
    fn from(error: &UpstreamError) -> Self {
        match error {
            UpstreamError::Auth { .. } => Self::UpstreamAuth,
            UpstreamError::Unavailable { .. } | UpstreamError::InvalidEndpoint { .. } => {
                Self::UpstreamUnavailable
            }
        }
    }
}
