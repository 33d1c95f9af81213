//! Domain models for the store directory.
//!
//! These are validated domain objects. Database row types live next to the
//! queries in [`crate::db`] and are converted into these on read.

pub mod pagination;
pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use pagination::Pagination;
pub use review::{NewReview, Review, ReviewWithAuthor};
pub use session::{CurrentUser, FlashKind, FlashMessage};
pub use store::{NearbyStore, NewStore, SearchResult, Store, TagCount, TopStore};
pub use user::{User, gravatar_url};
