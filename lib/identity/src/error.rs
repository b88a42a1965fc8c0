//! Error types for the identity crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `SessionError`: session token extraction, signing, and verification
//! - `DirectoryError`: user store operations
//! - `CacheError`: session cache operations (always degraded by callers)
//! - `RegistrationError`: high-level wrapper for the registration flow

use std::fmt;

/// Errors from session credential handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The authorization header is absent or not of the form `<scheme> <token>`.
    MissingCredential,
    /// The token failed verification (signature, structure, issuer, or expiry).
    InvalidToken { reason: String },
    /// The token could not be signed.
    Signing { reason: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "missing session credential"),
            Self::InvalidToken { reason } => write!(f, "invalid session token: {reason}"),
            Self::Signing { reason } => write!(f, "failed to sign session token: {reason}"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors from user directory operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// A user with this email already exists.
    DuplicateIdentity { email: String },
    /// No user matched the lookup key.
    NotFound { key: String },
    /// The store returned data that breaks a directory invariant.
    InvariantViolation { reason: String },
    /// The store could not be reached or timed out.
    StoreUnavailable { reason: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateIdentity { email } => {
                write!(f, "user with email '{email}' already exists")
            }
            Self::NotFound { key } => write!(f, "user not found: {key}"),
            Self::InvariantViolation { reason } => {
                write!(f, "user directory invariant violated: {reason}")
            }
            Self::StoreUnavailable { reason } => write!(f, "user store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Errors from session cache operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The cache could not be reached or timed out.
    Unavailable { reason: String },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "session cache unavailable: {reason}"),
        }
    }
}

impl std::error::Error for CacheError {}

/// High-level registration errors.
///
/// The outermost context of every report returned by
/// [`Registrar::register`](crate::Registrar::register).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The registration request failed structural validation.
    InvalidInput { field: &'static str, reason: String },
    /// The user vanished between duplicate detection and lookup.
    NotFound { email: String },
    /// The directory holds inconsistent data for this email.
    InvariantViolation { email: String },
    /// The user store could not be reached.
    StoreUnavailable,
    /// A session token could not be issued.
    Signing,
}

impl RegistrationError {
    /// Classifies a directory failure encountered while registering `email`.
    #[must_use]
    pub fn from_directory(email: &str, error: &DirectoryError) -> Self {
        match error {
            DirectoryError::NotFound { .. } => Self::NotFound {
                email: email.to_string(),
            },
            DirectoryError::StoreUnavailable { .. } => Self::StoreUnavailable,
            DirectoryError::DuplicateIdentity { .. } | DirectoryError::InvariantViolation { .. } => {
                Self::InvariantViolation {
                    email: email.to_string(),
                }
            }
        }
    }
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { field, reason } => {
                write!(f, "invalid registration field '{field}': {reason}")
            }
            Self::NotFound { email } => {
                write!(f, "registered user '{email}' could not be found")
            }
            Self::InvariantViolation { email } => {
                write!(f, "inconsistent directory state for '{email}'")
            }
            Self::StoreUnavailable => write!(f, "user store unavailable during registration"),
            Self::Signing => write!(f, "could not issue a session token"),
        }
    }
}

impl std::error::Error for RegistrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_invalid_token_display() {
        let err = SessionError::InvalidToken {
            reason: "signature mismatch".to_string(),
        };
        assert!(err.to_string().contains("invalid session token"));
        assert!(err.to_string().contains("signature mismatch"));
    }

    #[test]
    fn directory_error_duplicate_display() {
        let err = DirectoryError::DuplicateIdentity {
            email: "a@x.com".to_string(),
        };
        assert!(err.to_string().contains("a@x.com"));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn registration_error_classifies_directory_failures() {
        let unavailable = DirectoryError::StoreUnavailable {
            reason: "timed out".to_string(),
        };
        assert_eq!(
            RegistrationError::from_directory("a@x.com", &unavailable),
            RegistrationError::StoreUnavailable
        );

        let missing = DirectoryError::NotFound {
            key: "a@x.com".to_string(),
        };
        assert!(matches!(
            RegistrationError::from_directory("a@x.com", &missing),
            RegistrationError::NotFound { .. }
        ));

        let broken = DirectoryError::InvariantViolation {
            reason: "2 rows".to_string(),
        };
        assert!(matches!(
            RegistrationError::from_directory("a@x.com", &broken),
            RegistrationError::InvariantViolation { .. }
        ));
    }

    #[test]
    fn registration_error_invalid_input_names_field() {
        let err = RegistrationError::InvalidInput {
            field: "email",
            reason: "must contain '@'".to_string(),
        };
        assert!(err.to_string().contains("'email'"));
    }
}
