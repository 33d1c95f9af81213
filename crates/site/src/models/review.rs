//! Review domain types.

use chrono::{DateTime, Utc};

use delicious_core::{Rating, ReviewId, StoreId, UserId};

/// A review of a store. Reviews are never edited.
#[derive(Debug, Clone)]
pub struct Review {
    pub id: ReviewId,
    pub store_id: StoreId,
    pub author_id: UserId,
    pub text: String,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
}

/// A review joined with the fields of its author shown on the store page.
#[derive(Debug, Clone)]
pub struct ReviewWithAuthor {
    pub review: Review,
    pub author_name: String,
    pub author_gravatar: String,
}

/// Validated input for a new review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub store_id: StoreId,
    pub author_id: UserId,
    pub text: String,
    pub rating: Rating,
}
