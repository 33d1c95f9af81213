//! Store domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use delicious_core::{GeoError, GeoPoint, Location, Slug, StoreId, UserId, normalize_tags};

/// A store listing (domain type).
#[derive(Debug, Clone)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub tags: Vec<String>,
    pub location: Location,
    /// File name under the uploads directory.
    pub photo: Option<String>,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Whether `user_id` may edit this store.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.author_id == user_id
    }

    /// First `words` words of the description, for store cards.
    #[must_use]
    pub fn excerpt(&self, words: usize) -> String {
        self.description
            .split_whitespace()
            .take(words)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Store with its distance from a search point, as returned by the
/// proximity API.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyStore {
    pub id: StoreId,
    pub slug: Slug,
    pub name: String,
    pub description: String,
    pub location: Location,
    pub photo: Option<String>,
    /// Distance from the search point in metres.
    pub distance: f64,
}

/// A full-text search hit, ordered by `score` descending.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: StoreId,
    pub slug: Slug,
    pub name: String,
    pub description: String,
    pub photo: Option<String>,
    pub score: f64,
}

/// A tag and the number of stores carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// A store on the top-rated list.
#[derive(Debug, Clone)]
pub struct TopStore {
    pub store: Store,
    pub average_rating: f64,
    pub review_count: i64,
}

/// Validated store fields, ready to insert or update.
///
/// The slug and photo are assigned separately by the store service.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub location: Location,
}

/// Raw store form values as submitted.
///
/// Kept as strings so an invalid submission can be rendered back unchanged.
#[derive(Debug, Clone, Default)]
pub struct StoreForm {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub address: String,
    pub lng: String,
    pub lat: String,
}

impl StoreForm {
    /// Prefill the form from an existing store.
    #[must_use]
    pub fn from_store(store: &Store) -> Self {
        Self {
            name: store.name.clone(),
            description: store.description.clone(),
            tags: store.tags.clone(),
            address: store.location.address.clone(),
            lng: store.location.coordinates.lng().to_string(),
            lat: store.location.coordinates.lat().to_string(),
        }
    }

    /// Validate the submission.
    ///
    /// # Errors
    ///
    /// Returns every validation message, in form order.
    pub fn validate(&self) -> Result<NewStore, Vec<String>> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push("Please enter a store name!".to_owned());
        }

        let point = if self.lng.trim().is_empty() || self.lat.trim().is_empty() {
            errors.push("You must supply coordinates!".to_owned());
            None
        } else {
            match GeoPoint::parse(&self.lng, &self.lat) {
                Ok(point) => Some(point),
                Err(e) => {
                    errors.push(format!("Invalid coordinates: {e}"));
                    None
                }
            }
        };

        let location = match point.map(|p| Location::new(p, &self.address)) {
            Some(Ok(location)) => Some(location),
            Some(Err(GeoError::MissingAddress)) | None if self.address.trim().is_empty() => {
                errors.push("You must supply an address!".to_owned());
                None
            }
            Some(Err(e)) => {
                errors.push(e.to_string());
                None
            }
            None => None,
        };

        match location {
            Some(location) if errors.is_empty() => Ok(NewStore {
                name: name.to_owned(),
                description: self.description.trim().to_owned(),
                tags: normalize_tags(&self.tags),
                location,
            }),
            _ => Err(errors),
        }
    }

    /// Whether `tag` is selected on the form.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_form() -> StoreForm {
        StoreForm {
            name: "  Taco Town ".to_owned(),
            description: " Tacos. ".to_owned(),
            tags: vec!["Wifi".to_owned(), "Wifi".to_owned(), " ".to_owned()],
            address: "1 Main St".to_owned(),
            lng: "-79.8".to_owned(),
            lat: "43.2".to_owned(),
        }
    }

    #[test]
    fn test_validate_trims_and_normalizes() {
        let store = valid_form().validate().unwrap();
        assert_eq!(store.name, "Taco Town");
        assert_eq!(store.description, "Tacos.");
        assert_eq!(store.tags, vec!["Wifi".to_owned()]);
        assert_eq!(store.location.address, "1 Main St");
    }

    #[test]
    fn test_validate_requires_name() {
        let form = StoreForm {
            name: "   ".to_owned(),
            ..valid_form()
        };
        assert_eq!(form.validate().unwrap_err(), vec!["Please enter a store name!"]);
    }

    #[test]
    fn test_validate_requires_coordinates_and_address() {
        let form = StoreForm {
            address: String::new(),
            lng: String::new(),
            ..valid_form()
        };
        assert_eq!(
            form.validate().unwrap_err(),
            vec!["You must supply coordinates!", "You must supply an address!"]
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range_coordinates() {
        let form = StoreForm {
            lat: "123".to_owned(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid coordinates"));
    }

    #[test]
    fn test_has_tag() {
        let form = valid_form();
        assert!(form.has_tag("Wifi"));
        assert!(!form.has_tag("Licensed"));
    }
}
