//! Authentication route handlers.
//!
//! Handles login, registration and logout with email and password.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, clear_current_user, push_flash, set_current_user};
use crate::models::{CurrentUser, FlashKind};
use crate::services::auth::{AuthError, AuthService, validate_registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "password-confirm")]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template (also carries the forgot-password form).
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub name: String,
    pub email: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(page: PageContext) -> impl IntoResponse {
    LoginTemplate { page }
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            set_current_user(&session, &CurrentUser::from(&user)).await?;
            push_flash(&session, FlashKind::Success, "You are now logged in!").await?;
            tracing::info!(user_id = %user.id, "User logged in");
            Ok(Redirect::to("/"))
        }
        Err(AuthError::InvalidCredentials) => {
            push_flash(&session, FlashKind::Error, "Failed Login!").await?;
            Ok(Redirect::to("/login"))
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: PageContext) -> impl IntoResponse {
    RegisterTemplate {
        page,
        name: String::new(),
        email: String::new(),
    }
}

/// Handle registration form submission.
///
/// On success the new user is logged in straight away.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let registration = match validate_registration(
        &form.name,
        &form.email,
        &form.password,
        &form.password_confirm,
    ) {
        Ok(registration) => registration,
        Err(errors) => return render_register(&state, &session, form, errors).await,
    };

    let user = match AuthService::new(state.pool()).register(&registration).await {
        Ok(user) => user,
        Err(AuthError::UserAlreadyExists) => {
            let errors = vec!["An account with that email already exists!".to_owned()];
            return render_register(&state, &session, form, errors).await;
        }
        Err(e) => return Err(e.into()),
    };

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    push_flash(&session, FlashKind::Success, "You are now logged in!").await?;

    Ok(Redirect::to("/").into_response())
}

/// Re-render the registration form with the submitted name and email.
async fn render_register(
    state: &AppState,
    session: &Session,
    form: RegisterForm,
    errors: Vec<String>,
) -> Result<Response> {
    let page = PageContext::load(Some(session), state, "/register")
        .await
        .with_errors(errors);
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        RegisterTemplate {
            page,
            name: form.name,
            email: form.email,
        },
    )
        .into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// Log out and return to the home page.
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    push_flash(&session, FlashKind::Success, "You are now logged out! 👋").await?;
    Ok(Redirect::to("/"))
}
