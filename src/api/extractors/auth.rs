use axum::{
    extract::{FromRequestParts, FromRef},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::state::AppState;
use crate::error::AppError;
use crate::domain::models::auth::TokenPair;
use crate::domain::models::user::{User, UserStatus};
use crate::domain::services::auth_service::REFRESH_TOKEN_DAYS;
use std::sync::Arc;
use tower_cookies::{Cookie, Cookies};
use tower_cookies::cookie::SameSite;
use tracing::{debug, warn, Span};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// A signed-in, active user together with the CSRF token of the session.
pub struct AuthUser {
    pub user: User,
    pub csrf_token: String,
}

impl AuthUser {
    /// Checks the `csrf_token` submitted with a mutating form.
    pub fn verify_csrf(&self, submitted: &str) -> Result<(), AppError> {
        if submitted.is_empty() || submitted != self.csrf_token {
            warn!(user_id = %self.user.id, "CSRF token mismatch");
            return Err(AppError::Forbidden("Invalid or missing CSRF token".into()));
        }
        Ok(())
    }
}

/// Resolves the session from the access cookie, falling back to a refresh-token rotation.
pub(crate) async fn resolve_session(cookies: &Cookies, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    if let Some(access) = cookies.get(ACCESS_COOKIE)
        && let Ok(claims) = state.auth_service.verify_access(access.value())
    {
        return match state.user_repo.find_by_id(&claims.sub).await? {
            Some(user) if user.status == UserStatus::Active => Ok(Some(AuthUser { user, csrf_token: claims.csrf_token })),
            _ => {
                debug!("Access token for missing or inactive user {}", claims.sub);
                clear_session_cookies(cookies, state.config.cookie_secure);
                Ok(None)
            }
        };
    }

    let Some(refresh) = cookies.get(REFRESH_COOKIE) else {
        return Ok(None);
    };
    let raw = refresh.value().to_string();

    let record = match state.auth_service.find_refresh(&raw).await {
        Ok(record) => record,
        Err(AppError::Unauthorized) => {
            clear_session_cookies(cookies, state.config.cookie_secure);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let user = match state.user_repo.find_by_id(&record.user_id).await? {
        Some(user) if user.status == UserStatus::Active => user,
        _ => {
            state.auth_repo.delete_refresh_family(record.family_id).await?;
            clear_session_cookies(cookies, state.config.cookie_secure);
            return Ok(None);
        }
    };

    let pair = state.auth_service.refresh(record, &user).await?;
    set_session_cookies(cookies, &pair, state.config.session_timeout_minutes, state.config.cookie_secure);
    debug!("Session refreshed for user {}", user.id);

    Ok(Some(AuthUser { user, csrf_token: pair.csrf_token }))
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_secure(secure);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    cookie
}

pub fn set_session_cookies(cookies: &Cookies, pair: &TokenPair, access_minutes: i64, secure: bool) {
    let mut access = session_cookie(ACCESS_COOKIE, pair.access_token.clone(), secure);
    access.set_max_age(time::Duration::minutes(access_minutes));
    cookies.add(access);

    let mut refresh = session_cookie(REFRESH_COOKIE, pair.refresh_token.clone(), secure);
    refresh.set_max_age(time::Duration::days(REFRESH_TOKEN_DAYS));
    cookies.add(refresh);
}

pub fn clear_session_cookies(cookies: &Cookies, secure: bool) {
    cookies.remove(session_cookie(ACCESS_COOKIE, String::new(), secure));
    cookies.remove(session_cookie(REFRESH_COOKIE, String::new(), secure));
}

fn cookies_of(parts: &Parts) -> Result<Cookies, Response> {
    parts.extensions.get::<Cookies>()
        .cloned()
        .ok_or_else(|| AppError::InternalWithMsg("CookieManagerLayer missing".into()).into_response())
}

fn login_redirect(parts: &Parts, cookies: &Cookies) -> Response {
    let target = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let location = format!("/login?next={}", urlencoding::encode(target));
    redirect_with_flash(cookies, &location, FlashKind::Warning, "Please login to continue")
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = cookies_of(parts)?;
        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        match resolve_session(&cookies, &app_state).await {
            Ok(Some(auth)) => {
                Span::current().record("user_id", auth.user.id.as_str());
                Ok(auth)
            }
            Ok(None) => Err(login_redirect(parts, &cookies)),
            Err(e) => Err(e.into_response()),
        }
    }
}

/// A signed-in administrator.
pub struct AdminUser(pub AuthUser);

impl std::ops::Deref for AdminUser {
    type Target = AuthUser;

    fn deref(&self) -> &AuthUser {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.user.is_admin() {
            warn!(user_id = %auth.user.id, path = %parts.uri.path(), "Non-admin tried to reach the back office");
            let cookies = cookies_of(parts)?;
            return Err(redirect_with_flash(&cookies, "/", FlashKind::Danger, "Access denied"));
        }
        Ok(AdminUser(auth))
    }
}

/// Redirect target after login: `next` when it is a local path, otherwise the role's home.
pub fn after_login_target(next: Option<&str>, user: &User) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ if user.is_admin() => "/admin".to_string(),
        _ => "/user/dashboard".to_string(),
    }
}

pub fn home_redirect(user: &User) -> Redirect {
    Redirect::to(&after_login_target(None, user))
}
