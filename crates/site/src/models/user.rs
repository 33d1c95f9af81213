//! User domain types.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use delicious_core::{Email, UserId};

/// Avatar size requested from Gravatar, in pixels.
const GRAVATAR_SIZE: u32 = 200;

/// A registered user (domain type).
///
/// The password hash and reset token never leave the repository layer.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address (lowercased).
    pub email: Email,
    /// Display name.
    pub name: String,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Gravatar image URL for this user.
    #[must_use]
    pub fn gravatar(&self) -> String {
        gravatar_url(&self.email)
    }
}

/// Gravatar image URL for an email address.
#[must_use]
pub fn gravatar_url(email: &Email) -> String {
    let digest = Sha256::digest(email.as_bytes());
    format!(
        "https://gravatar.com/avatar/{}?s={GRAVATAR_SIZE}",
        hex::encode(digest)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gravatar_uses_sha256_of_lowercased_email() {
        let email = Email::parse("  Wes@Example.com ").unwrap();
        let url = gravatar_url(&email);
        let expected = hex::encode(Sha256::digest(b"wes@example.com"));
        assert_eq!(url, format!("https://gravatar.com/avatar/{expected}?s=200"));
    }
}
