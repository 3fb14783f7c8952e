use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use chrono::Utc;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{error, info, warn};

use crate::api::dtos::requests::{non_empty, AdminEventQuery, CsrfForm};
use crate::api::extractors::auth::{AdminUser, AuthUser};
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::api::views::Page;
use crate::domain::models::event::{AdminEventFilter, Event, EventDraft, EventStatus};
use crate::domain::models::job::{Job, EVENT_CANCELLED};
use crate::domain::services::money::format_decimal;
use crate::domain::services::validation::{check_image, validate_event, EventInput};
use crate::error::AppError;
use crate::state::AppState;

const EVENTS_URL: &str = "/admin/events";

struct Upload {
    file_name: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Default)]
struct EventSubmission {
    csrf_token: String,
    input: EventInput,
    image: Option<Upload>,
}

fn bad_form(e: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Invalid form data: {}", e))
}

async fn read_event_form(mut multipart: Multipart) -> Result<EventSubmission, AppError> {
    let mut sub = EventSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().map(str::to_string).unwrap_or_default();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(bad_form)?;
            if !file_name.is_empty() && !data.is_empty() {
                sub.image = Some(Upload { file_name, content_type, data: data.to_vec() });
            }
            continue;
        }

        let value = field.text().await.map_err(bad_form)?;
        let input = &mut sub.input;
        match name.as_str() {
            "csrf_token" => sub.csrf_token = value,
            "title" => input.title = value,
            "description" => input.description = value,
            "category_id" => input.category_id = value,
            "start_date" => input.start_date = value,
            "start_time" => input.start_time = value,
            "end_date" => input.end_date = value,
            "end_time" => input.end_time = value,
            "location" => input.location = value,
            "capacity" => input.capacity = value,
            "price" => input.price = value,
            "status" => input.status = value,
            _ => {}
        }
    }
    Ok(sub)
}

fn input_from_event(event: &Event, tz: chrono_tz::Tz) -> EventInput {
    let start = event.start_at.with_timezone(&tz);
    let end = event.end_at.with_timezone(&tz);
    EventInput {
        title: event.title.clone(),
        description: event.description.clone(),
        category_id: event.category_id.clone(),
        start_date: start.format("%Y-%m-%d").to_string(),
        start_time: start.format("%H:%M").to_string(),
        end_date: end.format("%Y-%m-%d").to_string(),
        end_time: end.format("%H:%M").to_string(),
        location: event.location.clone(),
        capacity: event.capacity.to_string(),
        price: format_decimal(event.price_cents),
        status: event.status.to_string(),
    }
}

async fn render_form(state: &AppState, cookies: &Cookies, admin: &AuthUser, event: Option<&Event>, input: &EventInput, errors: &[String]) -> Result<Response, AppError> {
    let categories = state.category_repo.list().await?;
    let mut page = Page::load(state, cookies, Some(admin)).await?;
    page.insert("event", &event)
        .insert("form", input)
        .insert("categories", &categories)
        .insert("statuses", &EventStatus::ALL)
        .insert("errors", errors)
        .insert("section", "events");
    Ok(page.render(state, "admin/event_form.html")?.into_response())
}

/// Validates the submission. `Err` carries the messages to show on the form.
async fn validate_submission(state: &AppState, sub: &EventSubmission) -> Result<(EventDraft, Option<&'static str>), Vec<String>> {
    let category_exists = match state.category_repo.find_by_id(sub.input.category_id.trim()).await {
        Ok(found) => found.is_some(),
        Err(e) => {
            error!("Category lookup failed: {:?}", e);
            false
        }
    };
    let (draft, mut errors) = match validate_event(&sub.input, category_exists, state.config.tz()) {
        Ok(draft) => (Some(draft), Vec::new()),
        Err(errors) => (None, errors),
    };

    let ext = match &sub.image {
        Some(upload) => match check_image(&upload.file_name, upload.content_type.as_deref(), upload.data.len()) {
            Ok(ext) => Some(ext),
            Err(msg) => {
                errors.push(msg);
                None
            }
        },
        None => None,
    };

    match draft {
        Some(draft) if errors.is_empty() => Ok((draft, ext)),
        _ => Err(errors),
    }
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Query(query): Query<AdminEventQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = AdminEventFilter {
        search: non_empty(&query.search).map(str::to_string),
        category_id: non_empty(&query.category).map(str::to_string),
        status: non_empty(&query.status).and_then(|s| EventStatus::try_from(s.to_string()).ok()),
        ..Default::default()
    };
    let events = state.event_repo.list_admin(&filter).await?;
    let categories = state.category_repo.list().await?;

    let mut page = Page::load(&state, &cookies, Some(&admin.0)).await?;
    page.insert("events", &events)
        .insert("categories", &categories)
        .insert("statuses", &EventStatus::ALL)
        .insert("query_search", non_empty(&query.search).unwrap_or_default())
        .insert("query_category", non_empty(&query.category).unwrap_or_default())
        .insert("query_status", non_empty(&query.status).unwrap_or_default())
        .insert("section", "events");
    page.render(&state, "admin/events.html")
}

pub async fn new_event_page(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
) -> Result<Response, AppError> {
    let input = EventInput { status: EventStatus::Draft.to_string(), ..Default::default() };
    render_form(&state, &cookies, &admin, None, &input, &[]).await
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let sub = read_event_form(multipart).await?;
    admin.verify_csrf(&sub.csrf_token)?;

    let (draft, ext) = match validate_submission(&state, &sub).await {
        Ok(valid) => valid,
        Err(errors) => return render_form(&state, &cookies, &admin, None, &sub.input, &errors).await,
    };

    let image_url = match (&sub.image, ext) {
        (Some(upload), Some(ext)) => Some(state.image_store.save(ext, &upload.data).await?),
        _ => None,
    };

    let event = Event::new(draft, image_url, admin.user.id.clone());
    let created = state.event_repo.create(&event).await?;
    info!(event_id = %created.id, "Event created");

    Ok(redirect_with_flash(&cookies, EVENTS_URL, FlashKind::Success, "Event created successfully"))
}

pub async fn edit_event_page(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let Some(event) = state.event_repo.find_by_id(&event_id).await? else {
        return Ok(redirect_with_flash(&cookies, EVENTS_URL, FlashKind::Danger, "Event not found"));
    };
    let input = input_from_event(&event, state.config.tz());
    render_form(&state, &cookies, &admin, Some(&event), &input, &[]).await
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Path(event_id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let sub = read_event_form(multipart).await?;
    admin.verify_csrf(&sub.csrf_token)?;

    let Some(mut event) = state.event_repo.find_by_id(&event_id).await? else {
        return Ok(redirect_with_flash(&cookies, EVENTS_URL, FlashKind::Danger, "Event not found"));
    };

    let (draft, ext) = match validate_submission(&state, &sub).await {
        Ok(valid) => valid,
        Err(errors) => return render_form(&state, &cookies, &admin, Some(&event), &sub.input, &errors).await,
    };

    let stored = event.clone();
    if let (Some(upload), Some(ext)) = (&sub.image, ext) {
        event.image_url = Some(state.image_store.save(ext, &upload.data).await?);
    }
    event.apply(draft);
    let updated = match state.event_repo.update(&event).await {
        Ok(updated) => updated,
        Err(AppError::Conflict(msg)) => {
            if event.image_url != stored.image_url
                && let Some(fresh) = &event.image_url
                && let Err(e) = state.image_store.delete(fresh).await
            {
                warn!("Failed to delete rejected image {}: {:?}", fresh, e);
            }
            return render_form(&state, &cookies, &admin, Some(&stored), &sub.input, &[msg]).await;
        }
        Err(e) => return Err(e),
    };
    info!(event_id = %updated.id, "Event updated");

    let previous_status = stored.status;
    let previous_image = stored.image_url;

    if updated.image_url != previous_image
        && let Some(old) = previous_image
        && let Err(e) = state.image_store.delete(&old).await
    {
        warn!("Failed to delete replaced image {}: {:?}", old, e);
    }

    if previous_status != EventStatus::Cancelled && updated.status == EventStatus::Cancelled {
        queue_cancellation_notices(&state, &updated.id).await?;
    }

    Ok(redirect_with_flash(&cookies, EVENTS_URL, FlashKind::Success, "Event updated successfully"))
}

async fn queue_cancellation_notices(state: &AppState, event_id: &str) -> Result<(), AppError> {
    if !state.settings().await?.email_notifications {
        return Ok(());
    }
    let bookings = state.booking_repo.list_confirmed_for_event(event_id).await?;
    let now = Utc::now();
    for booking in &bookings {
        state.job_repo.create(&Job::new(EVENT_CANCELLED, booking.id.clone(), now)).await?;
    }
    info!(event_id, notices = bookings.len(), "Queued event cancellation notices");
    Ok(())
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Path(event_id): Path<String>,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    admin.verify_csrf(&form.csrf_token)?;
    let image_url = state.event_repo.find_by_id(&event_id).await?.and_then(|e| e.image_url);

    match state.event_repo.delete(&event_id).await {
        Ok(()) => {
            if let Some(url) = image_url
                && let Err(e) = state.image_store.delete(&url).await
            {
                warn!("Failed to delete image of removed event: {:?}", e);
            }
            info!(event_id = %event_id, "Event deleted");
            Ok(redirect_with_flash(&cookies, EVENTS_URL, FlashKind::Success, "Event deleted successfully"))
        }
        Err(AppError::Conflict(msg)) | Err(AppError::NotFound(msg)) => {
            Ok(redirect_with_flash(&cookies, EVENTS_URL, FlashKind::Danger, msg))
        }
        Err(e) => Err(e),
    }
}
