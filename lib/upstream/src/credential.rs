//! Third-party credential pair held for each user.
//!
//! Never logged: `Debug` redacts both halves.

use nowplaying_identity::User;

/// Access and refresh credentials for a user's Spotify account.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    access_token: String,
    refresh_token: String,
}

impl CredentialPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Takes the stored pair from a user record.
    #[must_use]
    pub fn of(user: &User) -> Self {
        Self::new(user.access_token(), user.refresh_token())
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Replaces the access credential after a refresh.
    ///
    /// The refresh credential is kept even if the provider rotated it.
    pub fn replace_access_token(&mut self, access_token: String) {
        self.access_token = access_token;
    }
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}
