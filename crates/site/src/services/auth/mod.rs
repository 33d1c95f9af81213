//! Authentication service.
//!
//! Provides password registration and login, account updates and the
//! emailed password reset flow.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long an emailed reset link stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Random bytes in a reset token before hex encoding.
const RESET_TOKEN_BYTES: usize = 20;

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: String,
}

/// A freshly issued password reset token.
///
/// Only the SHA-256 digest is stored; the raw token goes into the email.
#[derive(Debug)]
pub struct IssuedResetToken {
    pub user: User,
    pub token: String,
}

/// Authentication service.
///
/// Handles user registration, login, profile updates and password resets.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        let password_hash = hash_password(&registration.password)?;

        let user = self
            .users
            .create(&registration.email, &registration.name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update the user's display name and email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed email,
    /// `AuthError::MissingName` for a blank name and
    /// `AuthError::UserAlreadyExists` if another account uses the email.
    #[instrument(skip(self, name, email), fields(user_id = %user_id))]
    pub async fn update_account(
        &self,
        user_id: UserId,
        name: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }

        self.users
            .update_profile(user_id, name, &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a reset token for the account with this email.
    ///
    /// Returns `None` when the email is malformed or has no account, so
    /// callers can respond identically either way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    #[instrument(skip(self, email))]
    pub async fn issue_reset_token(
        &self,
        email: &str,
    ) -> Result<Option<IssuedResetToken>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        let user = self
            .users
            .set_reset_token(&email, &hash_reset_token(&token), expires_at)
            .await?;

        Ok(user.map(|user| IssuedResetToken { user, token }))
    }

    /// Check that a reset token is known and unexpired.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` otherwise.
    pub async fn verify_reset_token(&self, token: &str) -> Result<User, AuthError> {
        self.users
            .get_by_reset_token(&hash_reset_token(token))
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    /// Apply a password reset and consume the token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword` for
    /// bad input, `AuthError::InvalidResetToken` if the token is unknown,
    /// expired or already used.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<User, AuthError> {
        if password != password_confirm {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .consume_reset_token(&hash_reset_token(token), &password_hash)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(user)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validate a registration form.
///
/// # Errors
///
/// Returns every validation message, in form order.
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    password_confirm: &str,
) -> Result<Registration, Vec<String>> {
    let mut errors = Vec::new();

    let name = name.trim();
    if name.is_empty() {
        errors.push("You must supply a name!".to_owned());
    }

    let email = match Email::parse(email) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.push("That Email is not valid!".to_owned());
            None
        }
    };

    if password.is_empty() {
        errors.push("Password Cannot be Blank!".to_owned());
    } else if let Err(AuthError::WeakPassword(msg)) = validate_password(password) {
        errors.push(msg);
    }
    if password_confirm.is_empty() {
        errors.push("Confirmed Password cannot be blank!".to_owned());
    }
    if password != password_confirm {
        errors.push("Oops! Your passwords do not match".to_owned());
    }

    match email {
        Some(email) if errors.is_empty() => Ok(Registration {
            name: name.to_owned(),
            email,
            password: password.to_owned(),
        }),
        _ => Err(errors),
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

// =============================================================================
// Reset Tokens
// =============================================================================

/// Generate a random hex reset token.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 digest of a reset token, as stored in the database.
#[must_use]
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_password_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_reset_token_format() {
        let token = generate_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_reset_token());
    }

    #[test]
    fn test_hash_reset_token_is_stable_and_not_identity() {
        let token = "abc123";
        assert_eq!(hash_reset_token(token), hash_reset_token(token));
        assert_ne!(hash_reset_token(token), token);
        assert_eq!(hash_reset_token(token).len(), 64);
    }

    #[test]
    fn test_validate_registration_ok() {
        let registration =
            validate_registration(" Wes ", "Wes@Example.com", "hunter2hunter2", "hunter2hunter2")
                .unwrap();
        assert_eq!(registration.name, "Wes");
        assert_eq!(registration.email.as_str(), "wes@example.com");
    }

    #[test]
    fn test_validate_registration_collects_errors() {
        let errors = validate_registration("", "nope", "", "x").unwrap_err();
        assert_eq!(
            errors,
            vec![
                "You must supply a name!",
                "That Email is not valid!",
                "Password Cannot be Blank!",
                "Oops! Your passwords do not match",
            ]
        );
    }

    #[test]
    fn test_validate_registration_short_password() {
        let errors = validate_registration("Wes", "wes@example.com", "short", "short").unwrap_err();
        assert_eq!(errors, vec!["Password must be at least 8 characters"]);
    }
}
