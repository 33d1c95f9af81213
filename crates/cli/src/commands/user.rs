//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! delicious-cli user create -e wes@example.com -n "Wes" -p "correct horse"
//! ```
//!
//! # Environment Variables
//!
//! - `DELICIOUS_DATABASE_URL` - `PostgreSQL` connection string

use delicious_core::UserId;
use delicious_site::services::auth::{AuthError, AuthService, validate_registration};

use super::{CommandError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Input failed the same checks as the registration form.
    #[error("Invalid user: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a user account.
///
/// The password is checked against the registration rules.
///
/// # Errors
///
/// Returns `UserError` for invalid input, a taken email or database failure.
pub async fn create(email: &str, name: &str, password: &str) -> Result<UserId, UserError> {
    let registration =
        validate_registration(name, email, password, password).map_err(UserError::Invalid)?;

    let pool = connect().await?;

    tracing::info!("Creating user: {}", registration.email);
    let user = AuthService::new(&pool)
        .register(&registration)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => UserError::UserExists(email.to_owned()),
            other => UserError::Auth(other),
        })?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_rejects_invalid_input_before_connecting() {
        let err = create("not-an-email", "", "short").await.unwrap_err();
        let UserError::Invalid(messages) = err else {
            panic!("expected validation errors, got {err:?}");
        };
        assert!(messages.contains(&"You must supply a name!".to_owned()));
        assert!(messages.contains(&"That Email is not valid!".to_owned()));
    }
}
