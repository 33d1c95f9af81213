//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in user in route handlers and
//! helpers for storing the user in the session.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::flash::push_flash;
use crate::models::session::keys;
use crate::models::{CurrentUser, FlashKind};

/// Flash shown when a signed-out visitor hits a protected page.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Oops you must be logged in to do that!";

/// Extractor that requires a signed-in user.
///
/// HTML requests are redirected to `/login` with a flash message; `/api/`
/// requests get `401 Unauthorized`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_api = is_api_path(parts);

        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        if let Some(user) = session
            .get::<CurrentUser>(keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
        {
            return Ok(Self(user));
        }

        if is_api {
            return Err(AuthRejection::Unauthorized);
        }

        if let Err(e) = push_flash(session, FlashKind::Error, LOGIN_REQUIRED_MESSAGE).await {
            tracing::warn!(error = %e, "Failed to store login flash");
        }
        Err(AuthRejection::RedirectToLogin)
    }
}

/// Whether the request targets the JSON API.
///
/// Nested routers see the path with `/api` stripped, so the original URI is
/// checked when present.
fn is_api_path(parts: &Parts) -> bool {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0)
        .path()
        .starts_with("/api/")
}

/// Read the signed-in user from an optional session.
pub(crate) async fn current_user(session: Option<&Session>) -> Option<CurrentUser> {
    match session {
        Some(session) => session
            .get::<CurrentUser>(keys::CURRENT_USER)
            .await
            .ok()
            .flatten(),
        None => None,
    }
}

/// Store the signed-in user in the session.
///
/// The session ID is cycled first so a pre-login session ID cannot be
/// reused after authentication.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Clear the signed-in user from the session (logout) and cycle its ID.
///
/// Pending flash messages survive so the logout notice can be shown.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    session.cycle_id().await?;

    clear_sentry_user();
    Ok(())
}
