//! User domain type and the registration request that creates it.
//!
//! A `User` is a person who linked their Spotify account. Users are keyed
//! uniquely by email and carry the third-party credential pair used by the
//! upstream orchestrator.

use chrono::{DateTime, Utc};
use nowplaying_core::UserId;
use serde::Deserialize;

use crate::claims::Identity;
use crate::error::RegistrationError;

/// A registered user and their linked third-party account.
///
/// Not serializable; the HTTP layer renders its own view without credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// Internal user ID.
    id: UserId,
    /// Display name chosen at registration.
    username: String,
    /// Email address; unique across the directory.
    email: String,
    /// Account identifier at the third-party provider.
    provider_account_id: String,
    /// Current third-party access credential.
    access_token: String,
    /// Long-lived third-party refresh credential.
    refresh_token: String,
    /// First-party session secret generated at registration.
    session_secret: Option<String>,
    /// When the user record was created.
    created_at: DateTime<Utc>,
    /// When the user record was last updated.
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user from a validated registration.
    ///
    /// The user ID and session secret are generated here.
    #[must_use]
    pub fn register(registration: Registration) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username: registration.username,
            email: registration.email,
            provider_account_id: registration.provider_account_id,
            access_token: registration.access_token,
            refresh_token: registration.refresh_token,
            session_secret: Some(uuid::Uuid::new_v4().to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: UserId,
        username: String,
        email: String,
        provider_account_id: String,
        access_token: String,
        refresh_token: String,
        session_secret: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            email,
            provider_account_id,
            access_token,
            refresh_token,
            session_secret,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
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
    pub fn provider_account_id(&self) -> &str {
        &self.provider_account_id
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    #[must_use]
    pub fn session_secret(&self) -> Option<&str> {
        self.session_secret.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the identity claims this user's session tokens carry.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }

    /// Replaces the third-party access credential after a refresh.
    pub fn set_access_token(&mut self, access_token: String) {
        self.access_token = access_token;
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("provider_account_id", &self.provider_account_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// A request to register a user and link their third-party account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    #[serde(rename = "spotify_id")]
    pub provider_account_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl Registration {
    /// Checks that every field is present and the email is plausibly shaped.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::InvalidInput` naming the first bad field.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        let required = [
            ("username", &self.username),
            ("email", &self.email),
            ("spotify_id", &self.provider_account_id),
            ("access_token", &self.access_token),
            ("refresh_token", &self.refresh_token),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(RegistrationError::InvalidInput {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
        }

        let well_formed = match self.email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !self.email.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !well_formed {
            return Err(RegistrationError::InvalidInput {
                field: "email",
                reason: "must look like local@domain".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn registration(email: &str) -> Registration {
        Registration {
            username: "alice".to_string(),
            email: email.to_string(),
            provider_account_id: "spotify-alice".to_string(),
            access_token: "access-1".to_string(),
            refresh_token: "refresh-1".to_string(),
        }
    }

    #[test]
    fn register_generates_id_and_secret() {
        let user = User::register(registration("a@x.com"));

        assert!(user.id().to_string().starts_with("usr_"));
        assert!(user.session_secret().is_some());
        assert_eq!(user.email(), "a@x.com");
        assert_eq!(user.provider_account_id(), "spotify-alice");
        assert_eq!(user.created_at(), user.updated_at());
    }

    #[test]
    fn register_generates_distinct_secrets() {
        let first = User::register(registration("a@x.com"));
        let second = User::register(registration("b@x.com"));
        assert_ne!(first.session_secret(), second.session_secret());
    }

    #[test]
    fn set_access_token_updates_timestamp() {
        let mut user = User::register(registration("a@x.com"));
        let original_updated_at = user.updated_at();

        std::thread::sleep(std::time::Duration::from_millis(1));
        user.set_access_token("access-2".to_string());

        assert_eq!(user.access_token(), "access-2");
        assert_eq!(user.refresh_token(), "refresh-1");
        assert!(user.updated_at() > original_updated_at);
    }

    #[test]
    fn identity_carries_claims_fields() {
        let user = User::register(registration("a@x.com"));
        let identity = user.identity();

        assert_eq!(identity.user_id, user.id());
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.email, "a@x.com");
    }

    #[test]
    fn debug_redacts_credentials() {
        let user = User::register(registration("a@x.com"));
        let secret = user.session_secret().expect("secret").to_string();
        let rendered = format!("{user:?}");

        assert!(rendered.contains("a@x.com"));
        assert!(!rendered.contains("access-1"));
        assert!(!rendered.contains("refresh-1"));
        assert!(!rendered.contains(&secret));
    }

    #[test]
    fn registration_deserializes_spotify_id() {
        let json = r#"{
            "username": "alice",
            "email": "a@x.com",
            "spotify_id": "sp-1",
            "access_token": "at",
            "refresh_token": "rt"
        }"#;
        let parsed: Registration = serde_json::from_str(json).expect("deserialize");
        assert_eq!(parsed.provider_account_id, "sp-1");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_fields() {
        let mut input = registration("a@x.com");
        input.refresh_token = "  ".to_string();

        let err = input.validate().unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::InvalidInput {
                field: "refresh_token",
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_malformed_email() {
        for email in ["nobody", "@x.com", "a@", "a@b@c", "a b@x.com"] {
            let err = registration(email).validate().unwrap_err();
            assert!(
                matches!(err, RegistrationError::InvalidInput { field: "email", .. }),
                "{email} should be rejected"
            );
        }
    }
}
