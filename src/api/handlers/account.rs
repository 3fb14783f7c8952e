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

use crate::api::dtos::requests::{non_empty, PasswordForm, ProfileForm, UserBookingsQuery};
use crate::api::dtos::responses::AccountStats;
use crate::api::extractors::auth::AuthUser;
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::api::views::Page;
use crate::domain::models::booking::{BookingDetail, BookingStatus, UserBookingFilter, UserPeriod};
use crate::domain::services::auth_service::{hash_password, verify_password};
use crate::domain::services::calendar::generate_ics;
use crate::domain::services::periods::{current_month, local_midnight, local_today};
use crate::domain::services::validation::{validate_password_change, validate_profile};
use crate::error::AppError;
use crate::state::AppState;

const DASHBOARD_ROWS: i64 = 5;

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let tz = state.config.tz();
    let today_start = local_midnight(local_today(Utc::now(), tz), tz);

    let upcoming = state.booking_repo.list_for_user(&auth.user.id, &UserBookingFilter {
        event_starts_from: Some(today_start),
        limit: Some(DASHBOARD_ROWS),
        ..Default::default()
    }).await?;
    let past = state.booking_repo.list_for_user(&auth.user.id, &UserBookingFilter {
        event_starts_before: Some(today_start),
        newest_event_first: true,
        limit: Some(DASHBOARD_ROWS),
        ..Default::default()
    }).await?;
    let (total_bookings, total_spent_cents) = state.booking_repo.user_totals(&auth.user.id).await?;

    let mut page = Page::load(&state, &cookies, Some(&auth)).await?;
    page.insert("upcoming", &upcoming)
        .insert("past", &past)
        .insert("stats", &AccountStats { total_bookings, total_spent_cents });
    page.render(&state, "user/dashboard.html")
}

pub async fn bookings(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
    Query(query): Query<UserBookingsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let tz = state.config.tz();
    let mut filter = UserBookingFilter {
        status: non_empty(&query.status).and_then(|s| BookingStatus::try_from(s.to_string()).ok()),
        newest_event_first: true,
        ..Default::default()
    };
    match non_empty(&query.period).and_then(UserPeriod::parse) {
        Some(UserPeriod::Upcoming) => {
            filter.event_starts_from = Some(now);
            filter.newest_event_first = false;
        }
        Some(UserPeriod::Past) => filter.event_starts_before = Some(now),
        Some(UserPeriod::ThisMonth) => {
            let (start, end) = current_month(now, tz);
            filter.event_starts_from = Some(start);
            filter.event_starts_before = Some(end);
            filter.newest_event_first = false;
        }
        None => {}
    }

    let bookings = state.booking_repo.list_for_user(&auth.user.id, &filter).await?;

    let mut page = Page::load(&state, &cookies, Some(&auth)).await?;
    page.insert("bookings", &bookings)
        .insert("statuses", &BookingStatus::ALL)
        .insert("query_status", non_empty(&query.status).unwrap_or_default())
        .insert("query_period", non_empty(&query.period).unwrap_or_default());
    page.render(&state, "user/bookings.html")
}

/// The viewer's confirmed booking, or a redirect back to the bookings list.
async fn confirmed_booking(state: &AppState, cookies: &Cookies, auth: &AuthUser, booking_id: &str) -> Result<Result<BookingDetail, Response>, AppError> {
    match state.booking_repo.find_detail(booking_id).await? {
        Some(detail) if detail.booking.user_id == auth.user.id && detail.booking.status == BookingStatus::Confirmed => Ok(Ok(detail)),
        _ => Ok(Err(redirect_with_flash(cookies, "/user/bookings", FlashKind::Danger, "Booking not found"))),
    }
}

pub async fn ticket(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
    Path(booking_id): Path<String>,
) -> Result<Response, AppError> {
    let detail = match confirmed_booking(&state, &cookies, &auth, &booking_id).await? {
        Ok(detail) => detail,
        Err(redirect) => return Ok(redirect),
    };
    let mut page = Page::load(&state, &cookies, Some(&auth)).await?;
    page.insert("detail", &detail).insert("reference", &detail.booking.reference());
    Ok(page.render(&state, "user/ticket.html")?.into_response())
}

pub async fn ticket_calendar(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
    Path(booking_id): Path<String>,
) -> Result<Response, AppError> {
    let detail = match confirmed_booking(&state, &cookies, &auth, &booking_id).await? {
        Ok(detail) => detail,
        Err(redirect) => return Ok(redirect),
    };
    let settings = state.settings().await?;
    let ics = generate_ics(&detail, &settings.site_name);
    let disposition = format!("attachment; filename=\"ticket-{}.ics\"", detail.booking.reference());
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        ics,
    ).into_response())
}

fn profile_form(auth: &AuthUser) -> ProfileForm {
    ProfileForm {
        csrf_token: String::new(),
        first_name: auth.user.first_name.clone(),
        last_name: auth.user.last_name.clone(),
        email: auth.user.email.clone(),
        phone: auth.user.phone.clone().unwrap_or_default(),
    }
}

async fn render_profile(state: &AppState, cookies: &Cookies, auth: &AuthUser, form: &ProfileForm, errors: &[String]) -> Result<Response, AppError> {
    let (total_bookings, total_spent_cents) = state.booking_repo.user_totals(&auth.user.id).await?;
    let mut page = Page::load(state, cookies, Some(auth)).await?;
    page.insert("form", form)
        .insert("stats", &AccountStats { total_bookings, total_spent_cents })
        .insert("errors", errors);
    Ok(page.render(state, "user/profile.html")?.into_response())
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
) -> Result<Response, AppError> {
    render_profile(&state, &cookies, &auth, &profile_form(&auth), &[]).await
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    auth.verify_csrf(&form.csrf_token)?;
    let mut errors = validate_profile(&form.first_name, &form.last_name, &form.email);
    let email = form.email.trim().to_lowercase();
    if errors.is_empty() && state.user_repo.email_taken(&email, Some(&auth.user.id)).await? {
        errors.push("Email already in use by another account".to_string());
    }
    if !errors.is_empty() {
        return render_profile(&state, &cookies, &auth, &form, &errors).await;
    }

    let mut user = auth.user.clone();
    user.first_name = form.first_name.trim().to_string();
    user.last_name = form.last_name.trim().to_string();
    user.email = email;
    user.phone = Some(form.phone.trim().to_string()).filter(|p| !p.is_empty());
    user.updated_at = Utc::now();
    state.user_repo.update_profile(&user).await?;
    info!("Profile updated for user {}", user.id);

    Ok(redirect_with_flash(&cookies, "/user/profile", FlashKind::Success, "Profile updated successfully"))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
    Form(form): Form<PasswordForm>,
) -> Result<Response, AppError> {
    auth.verify_csrf(&form.csrf_token)?;
    let mut errors = validate_password_change(&form.current_password, &form.new_password, &form.confirm_password);
    if errors.is_empty() && !verify_password(&form.current_password, &auth.user.password_hash) {
        errors.push("Current password is incorrect".to_string());
    }
    if !errors.is_empty() {
        return render_profile(&state, &cookies, &auth, &profile_form(&auth), &errors).await;
    }

    state.user_repo.update_password(&auth.user.id, &hash_password(&form.new_password)?).await?;
    info!("Password changed for user {}", auth.user.id);
    Ok(redirect_with_flash(&cookies, "/user/profile", FlashKind::Success, "Password changed successfully"))
}
