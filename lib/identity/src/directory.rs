//! User directory: the durable store of registered users.
//!
//! Users are keyed by a generated `UserId` with a unique secondary key on
//! email. The PostgreSQL implementation lives in the server crate; the
//! in-memory one here backs tests and local development.

use async_trait::async_trait;
use nowplaying_core::UserId;
use tokio::sync::RwLock;

use crate::error::DirectoryError;
use crate::user::User;

/// Trait for user storage.
///
/// Implementations bound every store call with a timeout and report it as
/// `DirectoryError::StoreUnavailable`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Inserts a new user and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if a user with the same email exists.
    async fn create(&self, user: &User) -> Result<UserId, DirectoryError>;

    /// Finds the single user with `email`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on zero matches and `InvariantViolation` on more
    /// than one.
    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError>;

    /// Finds a user by ID.
    async fn find_by_id(&self, id: UserId) -> Result<User, DirectoryError>;

    /// Replaces the stored third-party access credential for `email`.
    ///
    /// Idempotent. Returns `NotFound` if the user no longer exists; callers
    /// decide whether that is fatal.
    async fn update_access_token(&self, email: &str, access_token: &str)
    -> Result<(), DirectoryError>;
}

/// In-memory user directory.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Returns true if no users are stored.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Counts stored users with `email`.
    pub async fn count_email(&self, email: &str) -> usize {
        self.users
            .read()
            .await
            .iter()
            .filter(|u| u.email() == email)
            .count()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn create(&self, user: &User) -> Result<UserId, DirectoryError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email() == user.email()) {
            return Err(DirectoryError::DuplicateIdentity {
                email: user.email().to_string(),
            });
        }
        users.push(user.clone());
        Ok(user.id())
    }

    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let users = self.users.read().await;
        let mut matches = users.iter().filter(|u| u.email() == email);
        match (matches.next(), matches.next()) {
            (Some(user), None) => Ok(user.clone()),
            (None, _) => Err(DirectoryError::NotFound {
                key: email.to_string(),
            }),
            (Some(_), Some(_)) => Err(DirectoryError::InvariantViolation {
                reason: format!("multiple users with email '{email}'"),
            }),
        }
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, DirectoryError> {
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.id() == id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound {
                key: id.to_string(),
            })
    }

    async fn update_access_token(
        &self,
        email: &str,
        access_token: &str,
    ) -> Result<(), DirectoryError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.email() == email)
            .ok_or_else(|| DirectoryError::NotFound {
                key: email.to_string(),
            })?;
        user.set_access_token(access_token.to_string());
        Ok(())
    }
}
