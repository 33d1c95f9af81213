//! Review repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{Email, Rating, ReviewId, StoreId, UserId};

use super::RepositoryError;
use crate::models::review::{NewReview, Review, ReviewWithAuthor};
use crate::models::user::gravatar_url;

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    store_id: i32,
    author_id: i32,
    text: String,
    rating: Rating,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ReviewWithAuthorRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    author_name: String,
    author_email: String,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            store_id: StoreId::new(row.store_id),
            author_id: UserId::new(row.author_id),
            text: row.text,
            rating: row.rating,
            created_at: row.created_at,
        }
    }
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, review), fields(store_id = %review.store_id, author_id = %review.author_id))]
    pub async fn create(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        // Using runtime query to avoid SQLx offline mode cache requirements
        let row: ReviewRow = sqlx::query_as(
            r"
            INSERT INTO delicious.reviews (store_id, author_id, text, rating)
            VALUES ($1, $2, $3, $4)
            RETURNING id, store_id, author_id, text, rating, created_at
            ",
        )
        .bind(review.store_id.as_i32())
        .bind(review.author_id.as_i32())
        .bind(&review.text)
        .bind(review.rating)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }

    /// Reviews of a store with their authors, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if an author email is invalid.
    pub async fn list_for_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        let rows: Vec<ReviewWithAuthorRow> = sqlx::query_as(
            r"
            SELECT r.id, r.store_id, r.author_id, r.text, r.rating, r.created_at,
                   u.name AS author_name, u.email AS author_email
            FROM delicious.reviews r
            JOIN delicious.users u ON u.id = r.author_id
            WHERE r.store_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            ",
        )
        .bind(store_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let email = Email::parse(&row.author_email).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
                })?;
                Ok(ReviewWithAuthor {
                    review: row.review.into(),
                    author_name: row.author_name,
                    author_gravatar: gravatar_url(&email),
                })
            })
            .collect()
    }
}
