use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Form,
};
use chrono::Utc;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::info;

use crate::api::dtos::requests::{non_empty, AdminBookingQuery, StatusForm};
use crate::api::dtos::responses::BookingTotals;
use crate::api::extractors::auth::AdminUser;
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::api::views::Page;
use crate::domain::models::booking::{Actor, BookingFilter, BookingStatus, StatusChange};
use crate::domain::services::csv_export::{booking_export_rows, to_csv, BOOKING_EXPORT_HEADERS};
use crate::domain::services::periods::CreatedPeriod;
use crate::error::AppError;
use crate::state::AppState;

const BOOKINGS_URL: &str = "/admin/bookings";

fn filter_from(query: &AdminBookingQuery, state: &AppState) -> BookingFilter {
    let window = non_empty(&query.period)
        .and_then(CreatedPeriod::parse)
        .map(|p| p.window(Utc::now(), state.config.tz()));
    BookingFilter {
        status: non_empty(&query.status).and_then(|s| BookingStatus::try_from(s.to_string()).ok()),
        search: non_empty(&query.search).map(str::to_string),
        created_from: window.map(|w| w.0),
        created_to: window.map(|w| w.1),
        limit: None,
    }
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Query(query): Query<AdminBookingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.booking_repo.list_admin(&filter_from(&query, &state)).await?;
    let totals = BookingTotals::from_bookings(&bookings);

    let mut page = Page::load(&state, &cookies, Some(&admin.0)).await?;
    page.insert("bookings", &bookings)
        .insert("totals", &totals)
        .insert("statuses", &BookingStatus::ALL)
        .insert("query_status", non_empty(&query.status).unwrap_or_default())
        .insert("query_period", non_empty(&query.period).unwrap_or_default())
        .insert("query_search", non_empty(&query.search).unwrap_or_default())
        .insert("section", "bookings");
    page.render(&state, "admin/bookings.html")
}

pub async fn export_bookings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<AdminBookingQuery>,
) -> Result<Response, AppError> {
    let bookings = state.booking_repo.list_admin(&filter_from(&query, &state)).await?;
    let body = to_csv(&BOOKING_EXPORT_HEADERS, &booking_export_rows(&bookings, state.config.tz()))?;
    let filename = format!("bookings_export_{}.csv", Utc::now().format("%Y-%m-%d"));
    info!(rows = bookings.len(), "Exported bookings");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    ).into_response())
}

pub async fn view_booking(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Path(booking_id): Path<String>,
) -> Result<Response, AppError> {
    let Some(detail) = state.booking_repo.find_detail(&booking_id).await? else {
        return Ok(redirect_with_flash(&cookies, BOOKINGS_URL, FlashKind::Danger, "Booking not found"));
    };
    let logs = state.booking_repo.list_logs(&booking_id).await?;

    let mut page = Page::load(&state, &cookies, Some(&admin.0)).await?;
    page.insert("detail", &detail)
        .insert("reference", &detail.booking.reference())
        .insert("logs", &logs)
        .insert("statuses", &BookingStatus::ALL)
        .insert("section", "bookings");
    Ok(page.render(&state, "admin/booking_view.html")?.into_response())
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Path(booking_id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    admin.verify_csrf(&form.csrf_token)?;
    let back = format!("{}/{}", BOOKINGS_URL, booking_id);

    let Ok(to) = BookingStatus::try_from(form.status.clone()) else {
        return Ok(redirect_with_flash(&cookies, &back, FlashKind::Danger, "Invalid status"));
    };
    let Some(booking) = state.booking_repo.find_by_id(&booking_id).await? else {
        return Ok(redirect_with_flash(&cookies, BOOKINGS_URL, FlashKind::Danger, "Booking not found"));
    };

    let action = format!("Status changed to {}", to);
    let change = match StatusChange::new(&booking, to, Actor::Admin, Some(&admin.user.id), action) {
        Ok(change) => change,
        Err(msg) => return Ok(redirect_with_flash(&cookies, &back, FlashKind::Danger, msg)),
    };

    match state.booking_repo.apply_status_change(&change).await {
        Ok(updated) => {
            info!(booking_id = %booking_id, from = %booking.status, to = %updated.status, admin_id = %admin.user.id, "Booking status changed");
            Ok(redirect_with_flash(&cookies, &back, FlashKind::Success, "Booking status updated successfully"))
        }
        Err(AppError::Conflict(msg)) => Ok(redirect_with_flash(&cookies, &back, FlashKind::Danger, msg)),
        Err(e) => Err(e),
    }
}
