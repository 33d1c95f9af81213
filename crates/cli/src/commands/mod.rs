//! CLI subcommand implementations.

pub mod migrate;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by commands that talk to the database.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the site database named by `DELICIOUS_DATABASE_URL`.
///
/// # Errors
///
/// Returns `CommandError` if the variable is unset or the connection fails.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DELICIOUS_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("DELICIOUS_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(delicious_site::db::create_pool(&database_url).await?)
}
