//! PostgreSQL user directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nowplaying_core::UserId;
use nowplaying_identity::{DirectoryError, User, UserDirectory};
use sqlx::{FromRow, PgPool};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    provider_account_id: String,
    access_token: String,
    refresh_token: String,
    session_secret: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, sqlx::Error> {
        let id = UserId::from_str(&self.id).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid user id '{}': {}", self.id, e),
            )))
        })?;
        Ok(User::with_all_fields(
            id,
            self.username,
            self.email,
            self.provider_account_id,
            self.access_token,
            self.refresh_token,
            self.session_secret,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// User directory backed by the `users` table.
///
/// Every query is bounded by `timeout`; expiry is reported as
/// `DirectoryError::StoreUnavailable`.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
    timeout: Duration,
}

impl PgUserDirectory {
    /// Creates a new user directory.
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        query: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<Result<T, sqlx::Error>, DirectoryError> {
        tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| DirectoryError::StoreUnavailable {
                reason: format!("{operation} timed out"),
            })
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    #[instrument(skip_all, fields(user_id = %user.id()))]
    async fn create(&self, user: &User) -> Result<UserId, DirectoryError> {
        let insert = sqlx::query(
            r#"
            INSERT INTO users (id, username, email, provider_account_id, access_token,
                               refresh_token, session_secret, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id().to_string())
        .bind(user.username())
        .bind(user.email())
        .bind(user.provider_account_id())
        .bind(user.access_token())
        .bind(user.refresh_token())
        .bind(user.session_secret())
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(&self.pool);

        self.bounded("create", insert)
            .await?
            .map_err(|e| insert_error(e, user.email()))?;
        Ok(user.id())
    }

    #[instrument(skip_all)]
    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let select = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, provider_account_id, access_token, refresh_token,
                   session_secret, created_at, updated_at
            FROM users
            WHERE email = $1
            LIMIT 2
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool);

        let rows = self.bounded("find_by_email", select).await?.map_err(store_error)?;
        single_match(rows, email)?
            .try_into_user()
            .map_err(store_error)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: UserId) -> Result<User, DirectoryError> {
        let select = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, provider_account_id, access_token, refresh_token,
                   session_secret, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool);

        match self.bounded("find_by_id", select).await?.map_err(store_error)? {
            Some(row) => row.try_into_user().map_err(store_error),
            None => Err(DirectoryError::NotFound { key: id.to_string() }),
        }
    }

    #[instrument(skip_all)]
    async fn update_access_token(
        &self,
        email: &str,
        access_token: &str,
    ) -> Result<(), DirectoryError> {
        let update = sqlx::query(
            r#"
            UPDATE users
            SET access_token = $2, updated_at = $3
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(access_token)
        .bind(Utc::now())
        .execute(&self.pool);

        let result = self
            .bounded("update_access_token", update)
            .await?
            .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound {
                key: email.to_string(),
            });
        }
        Ok(())
    }
}

/// Maps an insert failure; the unique email index reports duplicates.
fn insert_error(error: sqlx::Error, email: &str) -> DirectoryError {
    match error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DirectoryError::DuplicateIdentity {
                email: email.to_string(),
            }
        }
        other => store_error(other),
    }
}

/// Expects exactly one row for `email`.
fn single_match<T>(mut rows: Vec<T>, email: &str) -> Result<T, DirectoryError> {
    match (rows.pop(), rows.is_empty()) {
        (Some(row), true) => Ok(row),
        (None, _) => Err(DirectoryError::NotFound {
            key: email.to_string(),
        }),
        (Some(_), false) => Err(DirectoryError::InvariantViolation {
            reason: format!("multiple users with email '{email}'"),
        }),
    }
}

/// Classifies a driver error. Undecodable rows break a directory invariant;
/// everything else means the store is unusable right now.
fn store_error(error: sqlx::Error) -> DirectoryError {
    let reason = error.to_string();
    match error {
        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => {
            DirectoryError::InvariantViolation { reason }
        }
        _ => DirectoryError::StoreUnavailable { reason },
    }
}
