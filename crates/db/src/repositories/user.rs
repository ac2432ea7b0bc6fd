//! User repository for database operations.
//!
//! Emails are stored normalised and carry a unique index, so sign-up is a
//! single insert that either lands or reports the address as taken.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
};
use thiserror::Error;
use tracing::info;

use fintrack_core::auth::normalize_email;
use fintrack_shared::types::UserId;

use crate::entities::users;

/// Errors from user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// The email is already registered.
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// The database rejected a statement.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Unique identifier; owner of the user's ledger.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalised email.
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for UserRecord {
    fn from(row: users::Model) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

/// User storage.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a user.
    ///
    /// # Errors
    ///
    /// Returns `EmailTaken` if the email is already registered, or
    /// `Database` if the insert fails for another reason.
    pub async fn create(&self, name: &str, email: &str, password_hash: &str) -> Result<UserRecord, UserError> {
        let user = UserRecord {
            id: UserId::new(),
            name: name.to_string(),
            email: normalize_email(email),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        let row = users::ActiveModel {
            id: Set(user.id.into_inner()),
            name: Set(user.name.clone()),
            email: Set(user.email.clone()),
            password_hash: Set(user.password_hash.clone()),
            created_at: Set(user.created_at),
        };

        users::Entity::insert(row)
            .exec_without_returning(&self.db)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => UserError::EmailTaken(user.email.clone()),
                _ => UserError::Database(err),
            })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Finds a user by email, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserError> {
        let row = users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await?;
        Ok(row.map(UserRecord::from))
    }

    /// Finds a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, UserError> {
        let row = users::Entity::find_by_id(id.into_inner()).one(&self.db).await?;
        Ok(row.map(UserRecord::from))
    }

    /// Checks if an email is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn email_exists(&self, email: &str) -> Result<bool, UserError> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}
