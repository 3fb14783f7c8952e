use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::api::dtos::responses::AdminDashboardStats;
use crate::api::extractors::auth::AdminUser;
use crate::api::views::Page;
use crate::domain::models::booking::BookingFilter;
use crate::domain::models::user::UserRole;
use crate::error::AppError;
use crate::state::AppState;

const RECENT_ROWS: i64 = 5;

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let stats = AdminDashboardStats {
        total_users: state.user_repo.count_by_role(UserRole::User).await?,
        total_events: state.event_repo.count_all().await?,
        total_bookings: state.booking_repo.count_all().await?,
    };
    let recent_bookings = state.booking_repo.list_admin(&BookingFilter {
        limit: Some(RECENT_ROWS),
        ..Default::default()
    }).await?;
    let upcoming_events = state.event_repo.list_upcoming(Utc::now(), RECENT_ROWS).await?;

    let mut page = Page::load(&state, &cookies, Some(&admin.0)).await?;
    page.insert("stats", &stats)
        .insert("recent_bookings", &recent_bookings)
        .insert("upcoming_events", &upcoming_events)
        .insert("section", "dashboard");
    page.render(&state, "admin/dashboard.html")
}
