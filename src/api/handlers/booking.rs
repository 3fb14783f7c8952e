use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{info, warn};

use crate::api::dtos::requests::{BookForm, CheckoutForm, CsrfForm};
use crate::api::extractors::auth::AuthUser;
use crate::api::extractors::maybe_auth::MaybeAuthUser;
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::api::views::Page;
use crate::domain::models::booking::{Actor, Booking, BookingDetail, BookingLog, BookingStatus, StatusChange};
use crate::domain::models::event::EventStatus;
use crate::domain::models::job::{Job, BOOKING_CONFIRMED};
use crate::domain::services::checkout::{check_quantity, summarize, validate_card, CardInput};
use crate::domain::services::periods::local_today;
use crate::error::AppError;
use crate::state::AppState;

const SOLD_OUT_RACE: &str = "Sorry, these tickets are no longer available";
const EVENT_CLOSED: &str = "This event is no longer available for booking";

pub async fn book_event(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    cookies: Cookies,
    Path(event_id): Path<String>,
    Form(form): Form<BookForm>,
) -> Result<Response, AppError> {
    let event_url = format!("/events/{}", event_id);
    let Some(auth) = viewer else {
        let login = format!("/login?next={}", urlencoding::encode(&event_url));
        return Ok(redirect_with_flash(&cookies, &login, FlashKind::Info, "Please login to book tickets"));
    };
    auth.verify_csrf(&form.csrf_token)?;

    let listing = match state.event_repo.find_listing(&event_id).await? {
        Some(listing) if listing.event.status == EventStatus::Published && listing.event.end_at >= Utc::now() => listing,
        _ => return Ok(redirect_with_flash(&cookies, "/events", FlashKind::Danger, "Event not found")),
    };

    let settings = state.settings().await?;
    let quantity = form.quantity.trim().parse::<i64>().unwrap_or(0);
    if let Err(e) = check_quantity(quantity, settings.max_tickets_per_booking, listing.available()) {
        return Ok(redirect_with_flash(&cookies, &event_url, FlashKind::Danger, e.message()));
    }

    let booking = Booking::new(listing.event.id.clone(), auth.user.id.clone(), quantity as i32, listing.event.price_cents);
    let log = BookingLog::new(&booking.id, "Booking created", Some(&auth.user.id));

    match state.booking_repo.create_checked(&booking, &log).await {
        Ok(created) => {
            info!(booking_id = %created.id, event_id = %event_id, quantity, "Booking created");
            Ok(Redirect::to(&format!("/bookings/{}/checkout", created.id)).into_response())
        }
        Err(AppError::Conflict(_)) => {
            warn!(event_id = %event_id, quantity, "Booking lost the capacity race");
            Ok(redirect_with_flash(&cookies, &event_url, FlashKind::Danger, SOLD_OUT_RACE))
        }
        Err(e) => Err(e),
    }
}

/// The viewer's own booking, or a redirect with "Booking not found".
async fn own_booking(state: &AppState, cookies: &Cookies, auth: &AuthUser, booking_id: &str, back_to: &str) -> Result<Result<BookingDetail, Response>, AppError> {
    match state.booking_repo.find_detail(booking_id).await? {
        Some(detail) if detail.booking.user_id == auth.user.id => Ok(Ok(detail)),
        _ => Ok(Err(redirect_with_flash(cookies, back_to, FlashKind::Danger, "Booking not found"))),
    }
}

/// Payment is only taken while the event is still published and has not ended.
async fn event_still_open(state: &AppState, event_id: &str) -> Result<bool, AppError> {
    Ok(state.event_repo
        .find_by_id(event_id)
        .await?
        .is_some_and(|event| event.status == EventStatus::Published && event.end_at >= Utc::now()))
}

async fn render_checkout(state: &AppState, cookies: &Cookies, auth: &AuthUser, detail: &BookingDetail, form: &CheckoutForm, errors: &[String]) -> Result<Response, AppError> {
    let mut page = Page::load(state, cookies, Some(auth)).await?;
    page.insert("detail", detail)
        .insert("summary", &summarize(detail.booking.total_cents))
        .insert("reference", &detail.booking.reference())
        .insert("cardholder_name", &form.cardholder_name)
        .insert("errors", errors);
    Ok(page.render(state, "bookings/checkout.html")?.into_response())
}

pub async fn checkout_page(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
    Path(booking_id): Path<String>,
) -> Result<Response, AppError> {
    let detail = match own_booking(&state, &cookies, &auth, &booking_id, "/events").await? {
        Ok(detail) => detail,
        Err(redirect) => return Ok(redirect),
    };
    if detail.booking.status == BookingStatus::Pending && !event_still_open(&state, &detail.booking.event_id).await? {
        return Ok(redirect_with_flash(&cookies, "/user/bookings", FlashKind::Danger, EVENT_CLOSED));
    }
    match detail.booking.status {
        BookingStatus::Pending => render_checkout(&state, &cookies, &auth, &detail, &CheckoutForm::default(), &[]).await,
        BookingStatus::Confirmed => Ok(Redirect::to(&format!("/bookings/{}/confirmation", booking_id)).into_response()),
        BookingStatus::Cancelled => Ok(redirect_with_flash(&cookies, "/user/bookings", FlashKind::Danger, "This booking has been cancelled")),
    }
}

pub async fn checkout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
    Path(booking_id): Path<String>,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    auth.verify_csrf(&form.csrf_token)?;
    let detail = match own_booking(&state, &cookies, &auth, &booking_id, "/events").await? {
        Ok(detail) => detail,
        Err(redirect) => return Ok(redirect),
    };
    if detail.booking.status != BookingStatus::Pending {
        return Ok(redirect_with_flash(&cookies, "/user/bookings", FlashKind::Danger, "This booking can no longer be paid"));
    }
    if !event_still_open(&state, &detail.booking.event_id).await? {
        warn!(booking_id = %booking_id, event_id = %detail.booking.event_id, "Checkout refused for closed event");
        return Ok(redirect_with_flash(&cookies, "/user/bookings", FlashKind::Danger, EVENT_CLOSED));
    }

    let card = CardInput {
        cardholder_name: &form.cardholder_name,
        card_number: &form.card_number,
        expiry: &form.expiry,
        cvv: &form.cvv,
        accept_terms: form.accept_terms.is_some(),
    };
    let errors = validate_card(&card, local_today(Utc::now(), state.config.tz()));
    if !errors.is_empty() {
        return render_checkout(&state, &cookies, &auth, &detail, &form, &errors).await;
    }

    let change = StatusChange::new(&detail.booking, BookingStatus::Confirmed, Actor::Owner, Some(&auth.user.id), "Payment completed")
        .map_err(AppError::Conflict)?;
    match state.booking_repo.apply_status_change(&change).await {
        Ok(_) => {}
        Err(AppError::Conflict(msg)) => {
            return Ok(redirect_with_flash(&cookies, "/user/bookings", FlashKind::Danger, msg));
        }
        Err(e) => return Err(e),
    }
    info!(booking_id = %booking_id, "Payment completed");

    if state.settings().await?.email_notifications {
        state.job_repo.create(&Job::new(BOOKING_CONFIRMED, booking_id.clone(), Utc::now())).await?;
    }

    Ok(redirect_with_flash(
        &cookies,
        &format!("/bookings/{}/confirmation", booking_id),
        FlashKind::Success,
        "Payment successful! Your booking is confirmed.",
    ))
}

pub async fn confirmation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
    Path(booking_id): Path<String>,
) -> Result<Response, AppError> {
    let detail = match own_booking(&state, &cookies, &auth, &booking_id, "/events").await? {
        Ok(detail) if detail.booking.status == BookingStatus::Confirmed => detail,
        Ok(_) => return Ok(redirect_with_flash(&cookies, "/events", FlashKind::Danger, "Booking not found")),
        Err(redirect) => return Ok(redirect),
    };

    let mut page = Page::load(&state, &cookies, Some(&auth)).await?;
    page.insert("detail", &detail).insert("reference", &detail.booking.reference());
    Ok(page.render(&state, "bookings/confirmation.html")?.into_response())
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    cookies: Cookies,
    Path(booking_id): Path<String>,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    auth.verify_csrf(&form.csrf_token)?;
    if !state.settings().await?.allow_cancellations {
        return Ok(redirect_with_flash(&cookies, "/user/bookings", FlashKind::Danger, "Cancellations are currently not allowed"));
    }
    let detail = match own_booking(&state, &cookies, &auth, &booking_id, "/user/bookings").await? {
        Ok(detail) => detail,
        Err(redirect) => return Ok(redirect),
    };

    let change = match StatusChange::new(&detail.booking, BookingStatus::Cancelled, Actor::Owner, Some(&auth.user.id), "Cancelled by customer") {
        Ok(change) => change,
        Err(msg) => return Ok(redirect_with_flash(&cookies, "/user/bookings", FlashKind::Danger, msg)),
    };
    match state.booking_repo.apply_status_change(&change).await {
        Ok(_) => {
            info!(booking_id = %booking_id, "Booking cancelled by owner");
            Ok(redirect_with_flash(&cookies, "/user/bookings", FlashKind::Success, "Booking cancelled successfully"))
        }
        Err(AppError::Conflict(msg)) => Ok(redirect_with_flash(&cookies, "/user/bookings", FlashKind::Danger, msg)),
        Err(e) => Err(e),
    }
}
