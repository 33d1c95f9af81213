//! Integration tests for Delicious.
//!
//! # Running Tests
//!
//! ```bash
//! # Database tests: a migrated database (delicious-cli migrate)
//! TEST_DATABASE_URL=postgres://... cargo test -p delicious-integration-tests -- --ignored
//!
//! # End-to-end tests: a running site
//! SITE_BASE_URL=http://localhost:7777 cargo test -p delicious-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `database` - repository and service behaviour against `PostgreSQL`
//! - `site` - HTTP flows against a running server

use secrecy::SecretString;
use sqlx::PgPool;

use delicious_core::{GeoPoint, Location};
use delicious_site::models::{NewStore, User};
use delicious_site::services::auth::{AuthService, validate_registration};

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "hunter2hunter2";

/// Base URL of a running site (configurable via environment).
#[must_use]
pub fn site_base_url() -> String {
    std::env::var("SITE_BASE_URL").unwrap_or_else(|_| "http://localhost:7777".to_owned())
}

/// Connect to the migrated test database.
///
/// # Panics
///
/// Panics if `TEST_DATABASE_URL` is unset or the database is unreachable.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    delicious_site::db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to test database")
}

/// A short random token, unique per call, for names and emails.
#[must_use]
pub fn unique() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..12].to_owned()
}

/// Register a fresh user.
///
/// # Panics
///
/// Panics if registration fails.
pub async fn create_user(pool: &PgPool) -> User {
    let email = format!("test-{}@example.com", unique());
    let registration = validate_registration("Test User", &email, TEST_PASSWORD, TEST_PASSWORD)
        .expect("test registration is valid");
    AuthService::new(pool)
        .register(&registration)
        .await
        .expect("Failed to register test user")
}

/// Store fields at `point` with the given tags.
///
/// # Panics
///
/// Panics if `point` is out of range.
#[must_use]
pub fn new_store(name: &str, point: (f64, f64), tags: &[&str]) -> NewStore {
    let coordinates = GeoPoint::new(point.0, point.1).expect("valid test coordinates");
    NewStore {
        name: name.to_owned(),
        description: format!("{name} serves things worth writing home about."),
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        location: Location::new(coordinates, "1 Test Street").expect("valid test location"),
    }
}

/// A point unlikely to be shared with stores from other test runs.
#[must_use]
pub fn remote_point() -> (f64, f64) {
    let seed = uuid::Uuid::new_v4().as_u128();
    #[allow(clippy::cast_precision_loss)]
    let lng = -170.0 + (seed % 34_000) as f64 / 100.0;
    #[allow(clippy::cast_precision_loss)]
    let lat = -60.0 + ((seed >> 32) % 12_000) as f64 / 100.0;
    (lng, lat)
}
