use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use crate::api::dtos::requests::{CsrfForm, LoginForm, NextQuery, RegisterForm};
use crate::api::extractors::auth::{after_login_target, clear_session_cookies, home_redirect, set_session_cookies, REFRESH_COOKIE};
use crate::api::extractors::maybe_auth::MaybeAuthUser;
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::api::views::Page;
use crate::domain::models::user::{NewUserParams, User, UserRole, UserStatus};
use crate::domain::services::auth_service::{hash_password, verify_password};
use crate::domain::services::validation::validate_registration;
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{info, warn};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub async fn login_page(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    cookies: Cookies,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    if let Some(auth) = &viewer {
        return Ok(home_redirect(&auth.user).into_response());
    }
    let form = LoginForm { next: query.next, ..Default::default() };
    let mut page = Page::load(&state, &cookies, None).await?;
    page.insert("form", &form);
    Ok(page.render(&state, "auth/login.html")?.into_response())
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let mut errors = Vec::new();
    let email = form.email.trim().to_lowercase();

    if email.is_empty() || form.password.is_empty() {
        errors.push("Please enter both email and password".to_string());
    } else {
        match state.user_repo.find_by_email(&email).await? {
            Some(user) if verify_password(&form.password, &user.password_hash) => {
                match user.status {
                    UserStatus::Active => return start_session(&state, &cookies, &user, form.next.as_deref()).await,
                    UserStatus::Inactive => errors.push("Your account is inactive. Please contact support.".to_string()),
                    UserStatus::Banned => errors.push("Your account has been banned.".to_string()),
                }
            }
            _ => {
                warn!("Failed login attempt");
                errors.push(INVALID_CREDENTIALS.to_string());
            }
        }
    }

    let mut page = Page::load(&state, &cookies, None).await?;
    page.insert("form", &form).insert("errors", &errors);
    Ok(page.render(&state, "auth/login.html")?.into_response())
}

async fn start_session(state: &AppState, cookies: &Cookies, user: &User, next: Option<&str>) -> Result<Response, AppError> {
    let pair = state.auth_service.login(user).await?;
    set_session_cookies(cookies, &pair, state.config.session_timeout_minutes, state.config.cookie_secure);
    info!("User logged in: {}", user.id);

    let next = next.map(str::trim).filter(|n| !n.is_empty());
    Ok(Redirect::to(&after_login_target(next, user)).into_response())
}

pub async fn register_page(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    cookies: Cookies,
) -> Result<Response, AppError> {
    if let Some(auth) = &viewer {
        return Ok(home_redirect(&auth.user).into_response());
    }
    let mut page = Page::load(&state, &cookies, None).await?;
    page.insert("form", &RegisterForm::default());
    Ok(page.render(&state, "auth/register.html")?.into_response())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let mut errors = validate_registration(&form.first_name, &form.last_name, &form.email, &form.password, &form.password_confirm);
    let email = form.email.trim().to_lowercase();

    if errors.is_empty() && state.user_repo.email_taken(&email, None).await? {
        errors.push("Email already registered".to_string());
    }

    if errors.is_empty() {
        let user = User::new(NewUserParams {
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            email,
            phone: None,
            password_hash: hash_password(&form.password)?,
            role: UserRole::User,
            status: UserStatus::Active,
            created_by: None,
        });
        let created = state.user_repo.create(&user).await?;
        info!("Registered user {}", created.id);
        return Ok(redirect_with_flash(&cookies, "/login", FlashKind::Success, "Registration successful! Please login."));
    }

    let mut page = Page::load(&state, &cookies, None).await?;
    page.insert("form", &form).insert("errors", &errors);
    Ok(page.render(&state, "auth/register.html")?.into_response())
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    cookies: Cookies,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    if let Some(auth) = &viewer {
        auth.verify_csrf(&form.csrf_token)?;
    }
    if let Some(cookie) = cookies.get(REFRESH_COOKIE) {
        state.auth_service.logout(cookie.value()).await?;
    }
    clear_session_cookies(&cookies, state.config.cookie_secure);

    if let Some(auth) = viewer {
        info!("User logged out: {}", auth.user.id);
    }
    Ok(redirect_with_flash(&cookies, "/", FlashKind::Success, "You have been logged out"))
}

