use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use uuid::Uuid;

use crate::users::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (duplicate email).
    #[error("unique constraint violated: {}", constraint.as_deref().unwrap_or("unknown"))]
    UniqueViolation { constraint: Option<String> },

    /// The row targeted by an update no longer exists.
    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().map(str::to_string),
                };
            }
        }
        StoreError::Database(err)
    }
}

/// Durable keyed storage for user records.
///
/// Implementations must reject a second record with an existing email
/// through [`StoreError::UniqueViolation`], on insert and on update.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    /// Persists a new record and assigns its id.
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    /// Overwrites every mutable field of an existing record.
    async fn update(&self, user: &User) -> StoreResult<User>;

    /// Returns `false` when nothing was deleted.
    async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool>;

    /// Streams every record in store order.
    fn find_all(&self) -> BoxStream<'_, StoreResult<User>>;
}
