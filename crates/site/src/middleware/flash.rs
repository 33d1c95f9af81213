//! Session-backed flash messages.
//!
//! A flash is queued by one request (usually right before a redirect) and
//! shown once by the next page render.

use tower_sessions::Session;

use crate::models::session::keys;
use crate::models::{FlashKind, FlashMessage};

/// Queue a flash message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn push_flash(
    session: &Session,
    kind: FlashKind,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    let mut flashes: Vec<FlashMessage> = session.get(keys::FLASHES).await?.unwrap_or_default();
    flashes.push(FlashMessage {
        kind,
        message: message.into(),
    });
    session.insert(keys::FLASHES, flashes).await
}

/// Remove and return every queued flash message.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn take_flashes(
    session: &Session,
) -> Result<Vec<FlashMessage>, tower_sessions::session::Error> {
    Ok(session
        .remove::<Vec<FlashMessage>>(keys::FLASHES)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_flashes_are_taken_once_in_order() {
        let session = session();
        push_flash(&session, FlashKind::Success, "first").await.unwrap();
        push_flash(&session, FlashKind::Error, "second").await.unwrap();

        let flashes = take_flashes(&session).await.unwrap();
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].message, "first");
        assert_eq!(flashes[1].kind, FlashKind::Error);

        assert!(take_flashes(&session).await.unwrap().is_empty());
    }
}
