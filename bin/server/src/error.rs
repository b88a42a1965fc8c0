//! HTTP error mapping.
//!
//! Every failure leaves the server as `{"error": kind, "message": message}`
//! with a fixed message per kind. Details go to the log, never the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nowplaying_identity::{DirectoryError, RegistrationError, SessionError};
use nowplaying_upstream::ActivityError;
use rootcause::prelude::Report;
use serde_json::json;
use tracing::{error, warn};

/// An error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: &'static str,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, message: &'static str) -> Self {
        Self {
            status,
            kind,
            message,
        }
    }

    pub const MISSING_CREDENTIAL: Self = Self::new(
        StatusCode::UNAUTHORIZED,
        "missing_credential",
        "missing or malformed authorization header",
    );
    pub const INVALID_TOKEN: Self = Self::new(
        StatusCode::UNAUTHORIZED,
        "invalid_token",
        "invalid or expired session token",
    );
    pub const SIGNING: Self = Self::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "signing",
        "could not issue a session token",
    );
    pub const INVALID_INPUT: Self = Self::new(
        StatusCode::BAD_REQUEST,
        "invalid_input",
        "invalid registration request",
    );
    pub const CONFLICT: Self = Self::new(
        StatusCode::CONFLICT,
        "conflict",
        "a user with this email already exists",
    );
    pub const INVARIANT_VIOLATION: Self = Self::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "invariant_violation",
        "inconsistent user record",
    );
    pub const STORE_UNAVAILABLE: Self = Self::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "store_unavailable",
        "user store unavailable",
    );
    pub const UPSTREAM_AUTH: Self = Self::new(
        StatusCode::BAD_GATEWAY,
        "upstream_auth",
        "spotify rejected the stored credentials",
    );
    pub const UPSTREAM_UNAVAILABLE: Self = Self::new(
        StatusCode::BAD_GATEWAY,
        "upstream_unavailable",
        "spotify is unavailable",
    );

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The caller's verified session names no user (activity path).
    #[must_use]
    pub fn unknown_session_user() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "user_not_found",
            "no user for this session",
        )
    }

    /// A user lookup by ID failed (profile path).
    #[must_use]
    pub fn from_lookup(error: &DirectoryError) -> Self {
        match error {
            DirectoryError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "user_not_found", "user not found")
            }
            DirectoryError::DuplicateIdentity { .. } => Self::CONFLICT,
            DirectoryError::InvariantViolation { .. } => {
                error!(error = %error, "user lookup found inconsistent data");
                Self::INVARIANT_VIOLATION
            }
            DirectoryError::StoreUnavailable { .. } => {
                warn!(error = %error, "user lookup failed");
                Self::STORE_UNAVAILABLE
            }
        }
    }
}

impl From<&SessionError> for ApiError {
    fn from(error: &SessionError) -> Self {
        match error {
            SessionError::MissingCredential => Self::MISSING_CREDENTIAL,
            SessionError::InvalidToken { .. } => Self::INVALID_TOKEN,
            SessionError::Signing { .. } => {
                error!(error = %error, "session signing failed");
                Self::SIGNING
            }
        }
    }
}

impl From<Report<RegistrationError>> for ApiError {
    fn from(report: Report<RegistrationError>) -> Self {
        let context = report.current_context();
        match context {
            RegistrationError::InvalidInput { .. } => Self::INVALID_INPUT,
            RegistrationError::StoreUnavailable => {
                warn!(error = %context, "registration failed");
                Self::STORE_UNAVAILABLE
            }
            RegistrationError::NotFound { .. } | RegistrationError::InvariantViolation { .. } => {
                error!(error = %context, "registration failed");
                Self::INVARIANT_VIOLATION
            }
            RegistrationError::Signing => Self::SIGNING,
        }
    }
}

impl From<Report<ActivityError>> for ApiError {
    fn from(report: Report<ActivityError>) -> Self {
        let context = report.current_context();
        match context {
            ActivityError::UserNotFound { .. } => Self::unknown_session_user(),
            ActivityError::UpstreamAuth => Self::UPSTREAM_AUTH,
            ActivityError::UpstreamUnavailable => Self::UPSTREAM_UNAVAILABLE,
            ActivityError::StoreUnavailable => {
                warn!(error = %context, "activity lookup failed");
                Self::STORE_UNAVAILABLE
            }
            ActivityError::InvariantViolation { .. } => {
                error!(error = %context, "activity lookup found inconsistent data");
                Self::INVARIANT_VIOLATION
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.kind,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}
