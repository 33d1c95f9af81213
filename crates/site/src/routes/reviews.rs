//! Review route handlers.

use axum::{
    Form,
    extract::{Path, State},
    http::HeaderMap,
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use delicious_core::{Rating, StoreId, UserId};

use crate::error::Result;
use crate::middleware::{RequireAuth, push_flash};
use crate::models::{FlashKind, NewReview};
use crate::routes::redirect_back;
use crate::services::StoreService;
use crate::state::AppState;

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub text: String,
    /// Missing when no star was picked.
    pub rating: Option<String>,
}

impl ReviewForm {
    /// Validate into a review by `author` of `store`.
    ///
    /// # Errors
    ///
    /// Returns every validation message.
    pub fn validate(
        &self,
        store_id: StoreId,
        author_id: UserId,
    ) -> std::result::Result<NewReview, Vec<String>> {
        let mut errors = Vec::new();

        let text = self.text.trim();
        if text.is_empty() {
            errors.push("Your review needs some text!".to_owned());
        }
        let rating = match Rating::parse(self.rating.as_deref().unwrap_or_default()) {
            Ok(rating) => Some(rating),
            Err(_) => {
                errors.push("Please give the store a rating from 1 to 5 stars!".to_owned());
                None
            }
        };

        match rating {
            Some(rating) if errors.is_empty() => Ok(NewReview {
                store_id,
                author_id,
                text: text.to_owned(),
                rating,
            }),
            _ => Err(errors),
        }
    }
}

/// `POST /reviews/{id}`: add a review by the signed-in user.
#[instrument(skip(user, state, session, headers, form), fields(user_id = %user.id))]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect> {
    let store_id = StoreId::new(id);
    let fallback = "/stores";

    let review = match form.validate(store_id, user.id) {
        Ok(review) => review,
        Err(errors) => {
            for error in errors {
                push_flash(&session, FlashKind::Error, error).await?;
            }
            return Ok(redirect_back(&headers, fallback));
        }
    };

    StoreService::new(state.pool()).add_review(&review).await?;
    push_flash(&session, FlashKind::Success, "Review Saved!").await?;

    Ok(redirect_back(&headers, fallback))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(text: &str, rating: Option<&str>) -> ReviewForm {
        ReviewForm {
            text: text.to_owned(),
            rating: rating.map(str::to_owned),
        }
    }

    #[test]
    fn test_valid_review() {
        let review = form("  Great tacos ", Some("4"))
            .validate(StoreId::new(3), UserId::new(9))
            .unwrap();
        assert_eq!(review.text, "Great tacos");
        assert_eq!(review.rating.value(), 4);
        assert_eq!(review.store_id, StoreId::new(3));
        assert_eq!(review.author_id, UserId::new(9));
    }

    #[test]
    fn test_review_requires_text_and_rating() {
        let errors = form(" ", None)
            .validate(StoreId::new(3), UserId::new(9))
            .unwrap_err();
        assert_eq!(errors.len(), 2);

        let errors = form("ok", Some("6"))
            .validate(StoreId::new(3), UserId::new(9))
            .unwrap_err();
        assert_eq!(
            errors,
            vec!["Please give the store a rating from 1 to 5 stars!"]
        );
    }
}
