//! Store repository for database operations.
//!
//! Aggregations (tag counts, top-rated, proximity and text search) run in
//! the database; this module only binds parameters and maps rows.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use delicious_core::{
    EARTH_RADIUS_METERS, GeoPoint, Location, NEAR_LIMIT, NEAR_MAX_DISTANCE_METERS, PointKind,
    Slug, StoreId, UserId,
};

use super::RepositoryError;
use crate::models::store::{NearbyStore, NewStore, SearchResult, Store, TagCount, TopStore};

/// Stores listed on the top-rated page.
pub const TOP_LIMIT: i64 = 10;

/// Minimum number of reviews before a store can appear on the top-rated page.
pub const TOP_MIN_REVIEWS: i64 = 2;

/// Results returned by the text search API.
pub const SEARCH_LIMIT: i64 = 5;

/// Columns for [`StoreRow`]; every query aliases the stores table as `s`.
const STORE_COLUMNS: &str = "s.id, s.name, s.slug, s.description, s.tags, s.location_type, \
     s.lng, s.lat, s.address, s.photo, s.author_id, s.created_at";

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: i32,
    name: String,
    slug: String,
    description: String,
    tags: Vec<String>,
    location_type: String,
    lng: f64,
    lat: f64,
    address: String,
    photo: Option<String>,
    author_id: i32,
    created_at: DateTime<Utc>,
}

impl StoreRow {
    fn location(&self) -> Result<Location, RepositoryError> {
        if self.location_type != PointKind::Point.as_str() {
            return Err(RepositoryError::DataCorruption(format!(
                "unexpected location type for store {}: {}",
                self.id, self.location_type
            )));
        }
        let point = GeoPoint::new(self.lng, self.lat).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid coordinates for store {}: {e}", self.id))
        })?;
        Ok(Location {
            kind: PointKind::Point,
            coordinates: point,
            address: self.address.clone(),
        })
    }
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let location = row.location()?;
        Ok(Self {
            id: StoreId::new(row.id),
            name: row.name,
            slug: Slug::from_stored(row.slug),
            description: row.description,
            tags: row.tags,
            location,
            photo: row.photo,
            author_id: UserId::new(row.author_id),
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NearbyRow {
    #[sqlx(flatten)]
    store: StoreRow,
    distance: f64,
}

#[derive(sqlx::FromRow)]
struct TopRow {
    #[sqlx(flatten)]
    store: StoreRow,
    average_rating: f64,
    review_count: i64,
}

#[derive(sqlx::FromRow)]
struct SearchRow {
    id: i32,
    slug: String,
    name: String,
    description: String,
    photo: Option<String>,
    score: f64,
}

fn into_stores(rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
    rows.into_iter().map(Store::try_from).collect()
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Total number of stores.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM delicious.stores")
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }

    /// One page of stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Store>, RepositoryError> {
        // Using runtime query to avoid SQLx offline mode cache requirements
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS}
            FROM delicious.stores s
            ORDER BY s.created_at DESC, s.id DESC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Get a store by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(&format!(
            "SELECT {STORE_COLUMNS} FROM delicious.stores s WHERE s.id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    /// Get a store by slug.
    ///
    /// Slugs are not guaranteed unique; the oldest match wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS}
            FROM delicious.stores s
            WHERE s.slug = $1
            ORDER BY s.id
            LIMIT 1
            "
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    /// Number of stores whose slug matches `pattern`, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_slug_conflicts(&self, pattern: &str) -> Result<i64, RepositoryError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM delicious.stores WHERE slug ~* $1")
                .bind(pattern)
                .fetch_one(self.pool)
                .await?;

        Ok(count.0)
    }

    /// Insert a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, store), fields(author_id = %author_id, slug = %slug))]
    pub async fn create(
        &self,
        author_id: UserId,
        store: &NewStore,
        slug: &Slug,
        photo: Option<&str>,
    ) -> Result<Store, RepositoryError> {
        let row: StoreRow = sqlx::query_as(&format!(
            r"
            WITH s AS (
                INSERT INTO delicious.stores
                    (name, slug, description, tags, location_type, lng, lat, address, photo, author_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
            )
            SELECT {STORE_COLUMNS} FROM s
            "
        ))
        .bind(&store.name)
        .bind(slug.as_str())
        .bind(&store.description)
        .bind(&store.tags)
        .bind(store.location.kind.as_str())
        .bind(store.location.coordinates.lng())
        .bind(store.location.coordinates.lat())
        .bind(&store.location.address)
        .bind(photo)
        .bind(author_id.as_i32())
        .fetch_one(self.pool)
        .await?;

        Store::try_from(row)
    }

    /// Update a store's fields. A `None` photo keeps the current photo.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    #[instrument(skip(self, store), fields(store_id = %id, slug = %slug))]
    pub async fn update(
        &self,
        id: StoreId,
        store: &NewStore,
        slug: &Slug,
        photo: Option<&str>,
    ) -> Result<Store, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(&format!(
            r"
            WITH s AS (
                UPDATE delicious.stores
                SET name = $2, slug = $3, description = $4, tags = $5,
                    location_type = $6, lng = $7, lat = $8, address = $9,
                    photo = COALESCE($10, photo)
                WHERE id = $1
                RETURNING *
            )
            SELECT {STORE_COLUMNS} FROM s
            "
        ))
        .bind(id.as_i32())
        .bind(&store.name)
        .bind(slug.as_str())
        .bind(&store.description)
        .bind(&store.tags)
        .bind(store.location.kind.as_str())
        .bind(store.location.coordinates.lng())
        .bind(store.location.coordinates.lat())
        .bind(&store.location.address)
        .bind(photo)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound).and_then(Store::try_from)
    }

    /// Every tag with the number of stores carrying it, most used first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let counts: Vec<TagCount> = sqlx::query_as(
            r"
            SELECT tag, COUNT(*) AS count
            FROM delicious.stores, unnest(tags) AS tag
            GROUP BY tag
            ORDER BY count DESC, tag
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(counts)
    }

    /// Stores carrying `tag`, or every store with at least one tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS}
            FROM delicious.stores s
            WHERE ($1::text IS NULL AND cardinality(s.tags) > 0)
               OR $1 = ANY(s.tags)
            ORDER BY s.created_at DESC, s.id DESC
            "
        ))
        .bind(tag)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Stores with at least two reviews, highest average rating first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn top_rated(&self) -> Result<Vec<TopStore>, RepositoryError> {
        let rows: Vec<TopRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS},
                   AVG(r.rating)::float8 AS average_rating,
                   COUNT(r.id) AS review_count
            FROM delicious.stores s
            JOIN delicious.reviews r ON r.store_id = s.id
            GROUP BY s.id
            HAVING COUNT(r.id) >= $1
            ORDER BY average_rating DESC, review_count DESC, s.id
            LIMIT $2
            "
        ))
        .bind(TOP_MIN_REVIEWS)
        .bind(TOP_LIMIT)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(TopStore {
                    store: Store::try_from(row.store)?,
                    average_rating: row.average_rating,
                    review_count: row.review_count,
                })
            })
            .collect()
    }

    /// Stores within 10 km of `point`, nearest first.
    ///
    /// Distances are great-circle (haversine) distances in metres.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(lng = point.lng(), lat = point.lat()))]
    pub async fn near(&self, point: GeoPoint) -> Result<Vec<NearbyStore>, RepositoryError> {
        let rows: Vec<NearbyRow> = sqlx::query_as(&format!(
            r"
            SELECT * FROM (
                SELECT {STORE_COLUMNS},
                       2 * $3 * asin(least(1.0, sqrt(
                           power(sin(radians(s.lat - $2) / 2), 2)
                           + cos(radians($2)) * cos(radians(s.lat))
                             * power(sin(radians(s.lng - $1) / 2), 2)
                       ))) AS distance
                FROM delicious.stores s
            ) AS nearby
            WHERE distance <= $4
            ORDER BY distance, id
            LIMIT $5
            "
        ))
        .bind(point.lng())
        .bind(point.lat())
        .bind(EARTH_RADIUS_METERS)
        .bind(NEAR_MAX_DISTANCE_METERS)
        .bind(NEAR_LIMIT)
        .fetch_all(self.pool)
        .await?;

        debug!(count = rows.len(), "Found nearby stores");

        rows.into_iter()
            .map(|row| {
                let store = Store::try_from(row.store)?;
                Ok(NearbyStore {
                    id: store.id,
                    slug: store.slug,
                    name: store.name,
                    description: store.description,
                    location: store.location,
                    photo: store.photo,
                    distance: row.distance,
                })
            })
            .collect()
    }

    /// Full-text search over name and description, best match first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, RepositoryError> {
        let rows: Vec<SearchRow> = sqlx::query_as(
            r"
            SELECT s.id, s.slug, s.name, s.description, s.photo,
                   ts_rank(s.search_vector, q)::float8 AS score
            FROM delicious.stores s, websearch_to_tsquery('english', $1) AS q
            WHERE s.search_vector @@ q
            ORDER BY score DESC, s.id
            LIMIT $2
            ",
        )
        .bind(query)
        .bind(SEARCH_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SearchResult {
                id: StoreId::new(row.id),
                slug: Slug::from_stored(row.slug),
                name: row.name,
                description: row.description,
                photo: row.photo,
                score: row.score,
            })
            .collect())
    }

    /// Stores a user has hearted, most recently hearted first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_hearted_by(&self, user_id: UserId) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(&format!(
            r"
            SELECT {STORE_COLUMNS}
            FROM delicious.stores s
            JOIN delicious.hearts h ON h.store_id = s.id
            WHERE h.user_id = $1
            ORDER BY h.created_at DESC, s.id DESC
            "
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }
}
