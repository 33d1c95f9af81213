//! Per-request data every page template needs.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::middleware::auth::current_user;
use crate::middleware::flash::take_flashes;
use crate::models::{CurrentUser, FlashKind, FlashMessage};
use crate::state::AppState;

/// Layout data: the signed-in user, pending flashes and the map key.
///
/// Extracting this consumes the session's queued flashes, so only handlers
/// that render a page should extract it.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<FlashMessage>,
    pub map_key: Option<String>,
    /// Request path, used to highlight the active navigation link.
    pub path: String,
}

impl PageContext {
    /// Build the context from a session.
    pub async fn load(session: Option<&Session>, state: &AppState, path: &str) -> Self {
        let flashes = match session {
            Some(session) => take_flashes(session).await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to read flashes");
                Vec::new()
            }),
            None => Vec::new(),
        };

        Self {
            user: current_user(session).await,
            flashes,
            map_key: state.config().map_key.clone(),
            path: path.to_owned(),
        }
    }

    /// Add one error flash per message.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.flashes
            .extend(errors.into_iter().map(|message| FlashMessage {
                kind: FlashKind::Error,
                message,
            }));
        self
    }

    /// Whether the navigation link for `prefix` is active.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            return self.path == "/" || self.path.starts_with("/stores");
        }
        self.path.starts_with(prefix)
    }

    /// Whether the signed-in user owns a store authored by `author_id`.
    #[must_use]
    pub fn owns(&self, author_id: delicious_core::UserId) -> bool {
        self.user.as_ref().is_some_and(|u| u.id == author_id)
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_owned();
        Ok(Self::load(parts.extensions.get::<Session>(), state, &path).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_active() {
        let page = PageContext {
            path: "/stores/page/2".to_owned(),
            ..PageContext::default()
        };
        assert!(page.is_active("/"));
        assert!(!page.is_active("/tags"));

        let page = PageContext {
            path: "/tags/Wifi".to_owned(),
            ..PageContext::default()
        };
        assert!(page.is_active("/tags"));
        assert!(!page.is_active("/"));
    }

    #[test]
    fn test_with_errors_appends_error_flashes() {
        let page = PageContext::default().with_errors(vec!["bad".to_owned(), "worse".to_owned()]);
        assert_eq!(page.flashes.len(), 2);
        assert!(page.flashes.iter().all(|f| f.kind == FlashKind::Error));
    }
}
