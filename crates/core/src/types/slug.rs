//! URL slugs for stores.
//!
//! A slug is derived from a store's display name and must be unique across
//! stores. Uniqueness is resolved by counting the stores whose slug already
//! matches `^candidate(-[0-9]+)?$` and appending `-{count + 1}` when that
//! count is non-zero.
//!
//! The suffix is count-based, not max-plus-one: once a suffixed store is
//! gone, its suffix can be handed out again. The count and the insert that
//! follows are separate statements, so two stores created with the same name
//! at the same moment can end up sharing a slug.

use core::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Slug used when a name contains no characters that survive slugification.
pub const FALLBACK_SLUG: &str = "store";

/// A URL-safe store identifier.
///
/// ## Examples
///
/// ```
/// use delicious_core::Slug;
///
/// let candidate = Slug::from_name("Dang That's Delicious!");
/// assert_eq!(candidate.as_str(), "dang-that-s-delicious");
///
/// // Two stores already use this slug (or a suffixed form of it).
/// assert_eq!(candidate.with_conflicts(2).as_str(), "dang-that-s-delicious-3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Slugify a display name.
    ///
    /// Lowercases the name and collapses every run of characters that are not
    /// ASCII letters or digits into a single `-`, trimming separators from
    /// both ends.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        let mut pending_separator = false;

        for c in name.trim().chars().flat_map(char::to_lowercase) {
            if c.is_ascii_alphanumeric() {
                if pending_separator && !slug.is_empty() {
                    slug.push('-');
                }
                pending_separator = false;
                slug.push(c);
            } else {
                pending_separator = true;
            }
        }

        if slug.is_empty() {
            return Self(FALLBACK_SLUG.to_owned());
        }

        Self(slug)
    }

    /// Wrap an already-stored slug without re-slugifying it.
    #[must_use]
    pub const fn from_stored(slug: String) -> Self {
        Self(slug)
    }

    /// Resolve this candidate against the number of existing conflicting slugs.
    ///
    /// `conflicts` is the number of stores whose slug matches
    /// [`Slug::conflict_pattern`].
    #[must_use]
    pub fn with_conflicts(&self, conflicts: u64) -> Self {
        if conflicts == 0 {
            return self.clone();
        }
        Self(format!("{}-{}", self.0, conflicts + 1))
    }

    /// Case-insensitive pattern matching this slug or a numerically suffixed
    /// form of it.
    ///
    /// The pattern uses POSIX-compatible syntax so it can be passed to the
    /// database's regular expression operator as well as to [`Regex`].
    #[must_use]
    pub fn conflict_pattern(&self) -> String {
        format!("^{}(-[0-9]+)?$", regex::escape(&self.0))
    }

    /// Whether `existing` conflicts with this candidate.
    #[must_use]
    pub fn conflicts_with(&self, existing: &str) -> bool {
        Regex::new(&format!("(?i){}", self.conflict_pattern()))
            .is_ok_and(|re| re.is_match(existing))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Whether saving `new_name` over a record currently named `current_name`
/// requires a new slug.
///
/// Names are compared after trimming, matching how they are stored.
#[must_use]
pub fn name_changed(current_name: &str, new_name: &str) -> bool {
    current_name.trim() != new_name.trim()
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
