//! User repository for database operations.
//!
//! Covers accounts, password reset tokens and hearts (favorite stores).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{Email, StoreId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::user::User;

const USER_COLUMNS: &str = "id, email, name, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        // Using runtime query to avoid SQLx offline mode cache requirements
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM delicious.users WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM delicious.users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user along with their password hash, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserWithHashRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM delicious.users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, password_hash), fields(email = %email))]
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO delicious.users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email.as_str())
        .bind(name)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        User::try_from(row)
    }

    /// Update a user's name and email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the email belongs to another user.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            UPDATE delicious.users
            SET name = $2, email = $3
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(name)
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        row.ok_or(RepositoryError::NotFound).and_then(User::try_from)
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Store a hashed reset token for the user with this email.
    ///
    /// Returns `None` if no user has the email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self, token_hash), fields(email = %email))]
    pub async fn set_reset_token(
        &self,
        email: &Email,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            UPDATE delicious.users
            SET reset_password_token = $2, reset_password_expires = $3
            WHERE email = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email.as_str())
        .bind(token_hash)
        .bind(expires_at)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Find the user holding an unexpired reset token.
    ///
    /// Unknown and expired tokens both return `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            SELECT {USER_COLUMNS}
            FROM delicious.users
            WHERE reset_password_token = $1
              AND reset_password_expires > NOW()
            "
        ))
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Set a new password and clear the reset token in one conditional update.
    ///
    /// Returns `None` if the token is unknown, expired or already used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip_all)]
    pub async fn consume_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            UPDATE delicious.users
            SET password_hash = $2,
                reset_password_token = NULL,
                reset_password_expires = NULL
            WHERE reset_password_token = $1
              AND reset_password_expires > NOW()
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(token_hash)
        .bind(password_hash)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    // =========================================================================
    // Hearts
    // =========================================================================

    /// IDs of the stores a user has hearted, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn heart_ids(&self, user_id: UserId) -> Result<Vec<StoreId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, i32>(
            r"
            SELECT store_id FROM delicious.hearts
            WHERE user_id = $1
            ORDER BY created_at, store_id
            ",
        )
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(StoreId::new).collect())
    }

    /// Add the store to the user's hearts, or remove it if already present.
    ///
    /// Returns the user's updated heart set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self), fields(user_id = %user_id, store_id = %store_id))]
    pub async fn toggle_heart(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Vec<StoreId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM delicious.hearts WHERE user_id = $1 AND store_id = $2",
        )
        .bind(user_id.as_i32())
        .bind(store_id.as_i32())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed == 0 {
            // Inserting only when the store exists turns an unknown id into
            // zero affected rows instead of a foreign key error.
            let inserted = sqlx::query(
                r"
                INSERT INTO delicious.hearts (user_id, store_id)
                SELECT $1, id FROM delicious.stores WHERE id = $2
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(user_id.as_i32())
            .bind(store_id.as_i32())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                return Err(RepositoryError::NotFound);
            }
        }

        let ids = sqlx::query_scalar::<_, i32>(
            r"
            SELECT store_id FROM delicious.hearts
            WHERE user_id = $1
            ORDER BY created_at, store_id
            ",
        )
        .bind(user_id.as_i32())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ids.into_iter().map(StoreId::new).collect())
    }
}
