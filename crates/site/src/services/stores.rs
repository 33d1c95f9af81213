//! Store service.
//!
//! Wraps the store, review and heart repositories with slug assignment and
//! ownership checks.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use delicious_core::{GeoPoint, Slug, StoreId, UserId, name_changed};

use crate::db::{RepositoryError, ReviewRepository, StoreRepository, UserRepository};
use crate::models::pagination::Pagination;
use crate::models::review::{NewReview, Review, ReviewWithAuthor};
use crate::models::store::{NearbyStore, NewStore, SearchResult, Store, TagCount, TopStore};

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No store matches the id or slug.
    #[error("store not found")]
    NotFound,

    /// The store belongs to someone else.
    #[error("you must own a store in order to edit it")]
    NotOwner,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for StoreError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// One page of the store listing.
#[derive(Debug)]
pub struct StorePage {
    pub stores: Vec<Store>,
    pub pagination: Pagination,
}

/// A store with its reviews, for the detail page.
#[derive(Debug)]
pub struct StoreDetail {
    pub store: Store,
    pub reviews: Vec<ReviewWithAuthor>,
}

/// The tags page: every tag with its count plus the matching stores.
#[derive(Debug)]
pub struct TagListing {
    pub tags: Vec<TagCount>,
    pub stores: Vec<Store>,
}

/// Store service.
pub struct StoreService<'a> {
    stores: StoreRepository<'a>,
    reviews: ReviewRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> StoreService<'a> {
    /// Create a new store service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            stores: StoreRepository::new(pool),
            reviews: ReviewRepository::new(pool),
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Slugs
    // =========================================================================

    /// Produce a unique slug for `name`.
    ///
    /// Counts stores whose slug is the candidate or a numerically suffixed
    /// form of it and appends `-{count + 1}` when there are any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the count query fails.
    #[instrument(skip(self))]
    pub async fn assign_slug(&self, name: &str) -> Result<Slug, StoreError> {
        let candidate = Slug::from_name(name);
        let conflicts = self
            .stores
            .count_slug_conflicts(&candidate.conflict_pattern())
            .await?;

        Ok(candidate.with_conflicts(u64::try_from(conflicts).unwrap_or(0)))
    }

    // =========================================================================
    // Create / update
    // =========================================================================

    /// Create a store owned by `author_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    #[instrument(skip(self, store, photo), fields(author_id = %author_id, name = %store.name))]
    pub async fn create(
        &self,
        author_id: UserId,
        store: &NewStore,
        photo: Option<&str>,
    ) -> Result<Store, StoreError> {
        let slug = self.assign_slug(&store.name).await?;
        let created = self.stores.create(author_id, store, &slug, photo).await?;
        tracing::info!(store_id = %created.id, slug = %created.slug, "Store created");
        Ok(created)
    }

    /// Load a store for editing by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id and
    /// `StoreError::NotOwner` if the store belongs to another user.
    pub async fn get_owned(&self, id: StoreId, user_id: UserId) -> Result<Store, StoreError> {
        let store = self.stores.get_by_id(id).await?.ok_or(StoreError::NotFound)?;
        if !store.is_owned_by(user_id) {
            return Err(StoreError::NotOwner);
        }
        Ok(store)
    }

    /// Update a store owned by `user_id`.
    ///
    /// The slug is only recomputed when the name changes. A `None` photo
    /// keeps the existing one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` or `StoreError::NotOwner` as
    /// [`StoreService::get_owned`] does.
    #[instrument(skip(self, store, photo), fields(store_id = %id, user_id = %user_id))]
    pub async fn update(
        &self,
        id: StoreId,
        user_id: UserId,
        store: &NewStore,
        photo: Option<&str>,
    ) -> Result<Store, StoreError> {
        let current = self.get_owned(id, user_id).await?;

        let slug = if name_changed(&current.name, &store.name) {
            self.assign_slug(&store.name).await?
        } else {
            current.slug
        };

        Ok(self.stores.update(id, store, &slug, photo).await?)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// One page of stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn page(&self, page: u32) -> Result<StorePage, StoreError> {
        let count = self.stores.count().await?;
        let pagination = Pagination::new(page, count);
        let stores = if pagination.is_past_end() {
            Vec::new()
        } else {
            self.stores
                .list_page(pagination.limit(), pagination.offset())
                .await?
        };
        Ok(StorePage { stores, pagination })
    }

    /// A store and its reviews by slug.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no store has the slug.
    pub async fn detail(&self, slug: &str) -> Result<StoreDetail, StoreError> {
        let store = self
            .stores
            .get_by_slug(slug)
            .await?
            .ok_or(StoreError::NotFound)?;
        let reviews = self.reviews.list_for_store(store.id).await?;
        Ok(StoreDetail { store, reviews })
    }

    /// Tag counts and the stores carrying `tag` (or any tag when `None`).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn tags(&self, tag: Option<&str>) -> Result<TagListing, StoreError> {
        let (tags, stores) =
            tokio::try_join!(self.stores.tag_counts(), self.stores.list_by_tag(tag))?;
        Ok(TagListing { tags, stores })
    }

    /// Top-rated stores.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn top(&self) -> Result<Vec<TopStore>, StoreError> {
        Ok(self.stores.top_rated().await?)
    }

    /// Stores near a point.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn near(&self, point: GeoPoint) -> Result<Vec<NearbyStore>, StoreError> {
        Ok(self.stores.near(point).await?)
    }

    /// Text search; a blank query returns nothing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.stores.search(query).await?)
    }

    // =========================================================================
    // Reviews and hearts
    // =========================================================================

    /// Add a review.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the store doesn't exist.
    pub async fn add_review(&self, review: &NewReview) -> Result<Review, StoreError> {
        Ok(self.reviews.create(review).await?)
    }

    /// Toggle a heart and return the user's hearted store ids.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the store doesn't exist.
    pub async fn toggle_heart(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Vec<StoreId>, StoreError> {
        Ok(self.users.toggle_heart(user_id, store_id).await?)
    }

    /// IDs of the stores a user has hearted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn heart_ids(&self, user_id: UserId) -> Result<Vec<StoreId>, StoreError> {
        Ok(self.users.heart_ids(user_id).await?)
    }

    /// Stores a user has hearted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn hearted(&self, user_id: UserId) -> Result<Vec<Store>, StoreError> {
        Ok(self.stores.list_hearted_by(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_not_found_maps_to_store_not_found() {
        assert!(matches!(
            StoreError::from(RepositoryError::NotFound),
            StoreError::NotFound
        ));
        assert!(matches!(
            StoreError::from(RepositoryError::Conflict("x".to_owned())),
            StoreError::Repository(_)
        ));
    }
}
