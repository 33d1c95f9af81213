//! Core types for Delicious.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod geo;
pub mod id;
pub mod rating;
pub mod slug;
pub mod tag;

pub use email::{Email, EmailError};
pub use geo::{
    EARTH_RADIUS_METERS, GeoError, GeoPoint, Location, NEAR_LIMIT, NEAR_MAX_DISTANCE_METERS,
    PointKind,
};
pub use id::*;
pub use rating::{Rating, RatingError};
pub use slug::{FALLBACK_SLUG, Slug, name_changed};
pub use tag::{TAG_CHOICES, normalize_tags};
