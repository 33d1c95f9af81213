//! Account route handlers: profile editing and the password reset flow.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth, push_flash, set_current_user};
use crate::models::{CurrentUser, FlashKind};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Shown after a forgot-password request whether or not the account exists.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If that email belongs to an account, a password reset link is on its way.";

/// Shown for unknown, expired and already used reset tokens.
pub const RESET_INVALID_MESSAGE: &str = "Password reset is invalid or has expired";

// =============================================================================
// Form Types
// =============================================================================

/// Account form data.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "password-confirm")]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub page: PageContext,
    pub name: String,
    pub email: String,
    pub gravatar: String,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "reset.html")]
pub struct ResetTemplate {
    pub page: PageContext,
    pub token: String,
}

// =============================================================================
// Account
// =============================================================================

/// Display the account page.
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool()).get_user(user.id).await?;

    Ok(AccountTemplate {
        page,
        gravatar: user.gravatar(),
        name: user.name,
        email: user.email.into_inner(),
    })
}

/// Update the signed-in user's name and email.
#[instrument(skip(user, state, session, form), fields(user_id = %user.id))]
pub async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AccountForm>,
) -> Result<Redirect> {
    let result = AuthService::new(state.pool())
        .update_account(user.id, &form.name, &form.email)
        .await;

    match result {
        Ok(updated) => {
            set_current_user(&session, &CurrentUser::from(&updated)).await?;
            push_flash(&session, FlashKind::Success, "Updated the profile!").await?;
        }
        Err(AuthError::InvalidEmail(_)) => {
            push_flash(&session, FlashKind::Error, "That Email is not valid!").await?;
        }
        Err(AuthError::MissingName) => {
            push_flash(&session, FlashKind::Error, "You must supply a name!").await?;
        }
        Err(AuthError::UserAlreadyExists) => {
            push_flash(
                &session,
                FlashKind::Error,
                "An account with that email already exists!",
            )
            .await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to("/account"))
}

// =============================================================================
// Password Reset
// =============================================================================

/// Email a reset link if the address has an account.
///
/// The response is the same either way. Mail delivery failures are logged
/// and reported but not shown, for the same reason.
#[instrument(skip(state, session, form))]
pub async fn forgot(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Redirect> {
    if let Some(issued) = AuthService::new(state.pool())
        .issue_reset_token(&form.email)
        .await?
    {
        let reset_url = state
            .config()
            .absolute_url(&format!("/account/reset/{}", issued.token));

        if let Err(e) = state
            .email()
            .send_password_reset(issued.user.email.as_str(), &issued.user.name, &reset_url)
            .await
        {
            let event_id = sentry::capture_error(&e);
            tracing::error!(
                error = %e,
                user_id = %issued.user.id,
                sentry_event_id = %event_id,
                "Failed to send password reset email"
            );
        }
    }

    push_flash(&session, FlashKind::Success, RESET_REQUESTED_MESSAGE).await?;
    Ok(Redirect::to("/login"))
}

/// Display the reset form for a valid token.
pub async fn reset_page(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
) -> Result<Response> {
    match AuthService::new(state.pool()).verify_reset_token(&token).await {
        Ok(_) => {
            let path = format!("/account/reset/{token}");
            let page = PageContext::load(Some(&session), &state, &path).await;
            Ok(ResetTemplate { page, token }.into_response())
        }
        Err(AuthError::InvalidResetToken) => {
            push_flash(&session, FlashKind::Error, RESET_INVALID_MESSAGE).await?;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Apply a password reset and log the user in.
#[instrument(skip_all)]
pub async fn reset(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Redirect> {
    let result = AuthService::new(state.pool())
        .reset_password(&token, &form.password, &form.password_confirm)
        .await;

    let retry = Redirect::to(&format!("/account/reset/{token}"));
    match result {
        Ok(user) => {
            set_current_user(&session, &CurrentUser::from(&user)).await?;
            push_flash(
                &session,
                FlashKind::Success,
                "💃 Nice! Your password has been reset! You are now logged in!",
            )
            .await?;
            Ok(Redirect::to("/"))
        }
        Err(AuthError::PasswordMismatch) => {
            push_flash(&session, FlashKind::Error, "Passwords do not match!").await?;
            Ok(retry)
        }
        Err(AuthError::WeakPassword(message)) => {
            push_flash(&session, FlashKind::Error, message).await?;
            Ok(retry)
        }
        Err(AuthError::InvalidResetToken) => {
            push_flash(&session, FlashKind::Error, RESET_INVALID_MESSAGE).await?;
            Ok(Redirect::to("/login"))
        }
        Err(e) => Err(e.into()),
    }
}
