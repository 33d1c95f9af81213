//! Template view types.
//!
//! Flattened, display-ready projections of the domain models so templates
//! only do field access.

use chrono::{DateTime, Utc};

use delicious_core::{Rating, StoreId};

use crate::models::{CurrentUser, ReviewWithAuthor, Store, TagCount, TopStore};

/// Words of the description shown on a store card.
const CARD_EXCERPT_WORDS: usize = 25;

/// A store as shown in the card grid.
#[derive(Debug, Clone)]
pub struct StoreCard {
    pub id: StoreId,
    pub slug: String,
    pub name: String,
    pub excerpt: String,
    pub photo: Option<String>,
    pub hearted: bool,
    pub editable: bool,
}

impl StoreCard {
    /// Build a card for `store` as seen by `user`.
    #[must_use]
    pub fn new(store: &Store, user: Option<&CurrentUser>, hearts: &[StoreId]) -> Self {
        Self {
            id: store.id,
            slug: store.slug.as_str().to_owned(),
            name: store.name.clone(),
            excerpt: store.excerpt(CARD_EXCERPT_WORDS),
            photo: store.photo.clone(),
            hearted: hearts.contains(&store.id),
            editable: user.is_some_and(|u| store.is_owned_by(u.id)),
        }
    }

    /// Cards for a list of stores.
    #[must_use]
    pub fn list(stores: &[Store], user: Option<&CurrentUser>, hearts: &[StoreId]) -> Vec<Self> {
        stores.iter().map(|s| Self::new(s, user, hearts)).collect()
    }
}

/// A review on the store page.
#[derive(Debug, Clone)]
pub struct ReviewView {
    pub author_name: String,
    pub author_gravatar: String,
    pub text: String,
    pub stars: String,
    pub posted: String,
}

impl ReviewView {
    #[must_use]
    pub fn new(review: &ReviewWithAuthor, now: DateTime<Utc>) -> Self {
        Self {
            author_name: review.author_name.clone(),
            author_gravatar: review.author_gravatar.clone(),
            text: review.review.text.clone(),
            stars: stars(review.review.rating),
            posted: time_ago(review.review.created_at, now),
        }
    }
}

/// A row of the top-rated table.
#[derive(Debug, Clone)]
pub struct TopStoreRow {
    pub rank: usize,
    pub slug: String,
    pub name: String,
    pub photo: Option<String>,
    pub average: String,
    pub review_count: i64,
}

impl TopStoreRow {
    /// Rows numbered from 1 in the given order.
    #[must_use]
    pub fn list(top: &[TopStore]) -> Vec<Self> {
        top.iter()
            .enumerate()
            .map(|(i, t)| Self {
                rank: i + 1,
                slug: t.store.slug.as_str().to_owned(),
                name: t.store.name.clone(),
                photo: t.store.photo.clone(),
                average: format!("{:.1}", t.average_rating),
                review_count: t.review_count,
            })
            .collect()
    }
}

/// A tag pill on the tags page.
#[derive(Debug, Clone)]
pub struct TagLink {
    pub tag: String,
    pub count: i64,
    pub active: bool,
}

impl TagLink {
    #[must_use]
    pub fn list(tags: &[TagCount], selected: Option<&str>) -> Vec<Self> {
        tags.iter()
            .map(|t| Self {
                tag: t.tag.clone(),
                count: t.count,
                active: selected == Some(t.tag.as_str()),
            })
            .collect()
    }
}

/// Filled and empty stars for a rating, e.g. `★★★☆☆`.
#[must_use]
pub fn stars(rating: Rating) -> String {
    let filled = usize::from(rating.value());
    let empty = usize::from(Rating::MAX).saturating_sub(filled);
    format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}

/// Coarse relative time such as `3 days ago`.
#[must_use]
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let (amount, unit) = match seconds {
        0..=59 => return "a few seconds ago".to_owned(),
        60..=3_599 => (seconds / 60, "minute"),
        3_600..=86_399 => (seconds / 3_600, "hour"),
        86_400..=2_591_999 => (seconds / 86_400, "day"),
        2_592_000..=31_535_999 => (seconds / 2_592_000, "month"),
        _ => (seconds / 31_536_000, "year"),
    };
    if amount == 1 {
        format!("a {unit} ago")
    } else {
        format!("{amount} {unit}s ago")
    }
}
