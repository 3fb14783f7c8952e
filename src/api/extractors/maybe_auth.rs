use axum::{
    extract::{FromRequestParts, FromRef},
    http::request::Parts,
};
use crate::api::extractors::auth::{resolve_session, AuthUser};
use crate::state::AppState;
use std::convert::Infallible;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{error, Span};

/// The signed-in user if there is one; never rejects.
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(cookies) = parts.extensions.get::<Cookies>().cloned() else {
            return Ok(MaybeAuthUser(None));
        };
        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        match resolve_session(&cookies, &app_state).await {
            Ok(Some(auth)) => {
                Span::current().record("user_id", auth.user.id.as_str());
                Ok(MaybeAuthUser(Some(auth)))
            }
            Ok(None) => Ok(MaybeAuthUser(None)),
            Err(e) => {
                // Treat as guest.
                error!("Session lookup failed: {:?}", e);
                Ok(MaybeAuthUser(None))
            }
        }
    }
}
