use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::api::extractors::maybe_auth::MaybeAuthUser;
use crate::api::views::Page;
use crate::domain::services::periods::{local_midnight, local_today};
use crate::error::AppError;
use crate::state::AppState;

const FEATURED_LIMIT: i64 = 6;

pub async fn home(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let tz = state.config.tz();
    let today_start = local_midnight(local_today(Utc::now(), tz), tz);

    let featured = state.event_repo.list_upcoming(today_start, FEATURED_LIMIT).await?;
    let categories: Vec<_> = state.category_repo.list_with_counts(Some(today_start)).await?
        .into_iter()
        .filter(|c| c.event_count > 0)
        .collect();
    let upcoming_count = state.event_repo.count_upcoming(today_start).await?;

    let mut page = Page::load(&state, &cookies, viewer.as_ref()).await?;
    page.insert("featured", &featured)
        .insert("categories", &categories)
        .insert("upcoming_count", &upcoming_count);
    page.render(&state, "home.html")
}
