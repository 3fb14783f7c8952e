use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::api::dtos::requests::{non_empty, EventListQuery};
use crate::api::dtos::responses::ActiveFilter;
use crate::api::extractors::maybe_auth::MaybeAuthUser;
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::api::views::Page;
use crate::domain::models::event::{EventFilter, EventSort, EventStatus, PriceBand, FEW_SEATS_LEFT};
use crate::domain::services::checkout::max_selectable;
use crate::domain::services::periods::EventDateFilter;
use crate::error::AppError;
use crate::state::AppState;

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    cookies: Cookies,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let tz = state.config.tz();
    let categories = state.category_repo.list().await?;

    let date = non_empty(&query.date).and_then(EventDateFilter::parse);
    let price = non_empty(&query.price).and_then(PriceBand::parse);
    let category_id = non_empty(&query.category).map(str::to_string);
    let search = non_empty(&query.search).map(str::to_string);

    let filter = EventFilter {
        search: search.clone(),
        category_id: category_id.clone(),
        starts_between: date.map(|d| d.window(now, tz)),
        price,
        sort: non_empty(&query.sort).map(EventSort::parse).unwrap_or_default(),
    };
    let events = state.event_repo.list_public(&filter, now).await?;

    let mut active = Vec::new();
    if let Some(search) = search {
        active.push(ActiveFilter { label: "Search", value: search });
    }
    if let Some(id) = &category_id
        && let Some(category) = categories.iter().find(|c| &c.id == id)
    {
        active.push(ActiveFilter { label: "Category", value: category.name.clone() });
    }
    if let Some(date) = date {
        active.push(ActiveFilter { label: "Date", value: date.label().to_string() });
    }
    if let Some(price) = price {
        active.push(ActiveFilter { label: "Price", value: price.label().to_string() });
    }

    let mut page = Page::load(&state, &cookies, viewer.as_ref()).await?;
    page.insert("events", &events)
        .insert("categories", &categories)
        .insert("active_filters", &active)
        .insert("query_search", non_empty(&query.search).unwrap_or_default())
        .insert("query_category", category_id.as_deref().unwrap_or_default())
        .insert("query_date", non_empty(&query.date).unwrap_or_default())
        .insert("query_price", non_empty(&query.price).unwrap_or_default())
        .insert("query_sort", non_empty(&query.sort).unwrap_or("date_asc"));
    page.render(&state, "events/list.html")
}

pub async fn view_event(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    cookies: Cookies,
    Path(event_id): Path<String>,
) -> Result<Response, AppError> {
    let listing = match state.event_repo.find_listing(&event_id).await? {
        Some(listing) if listing.event.status == EventStatus::Published => listing,
        _ => return Ok(redirect_with_flash(&cookies, "/events", FlashKind::Danger, "Event not found")),
    };

    let mut page = Page::load(&state, &cookies, viewer.as_ref()).await?;
    let available = listing.available();
    let max_quantity = max_selectable(available, page.settings.max_tickets_per_booking);
    let ended = listing.event.end_at < Utc::now();

    page.insert("listing", &listing)
        .insert("available", &available)
        .insert("few_left", &(available > 0 && available <= FEW_SEATS_LEFT))
        .insert("max_quantity", &max_quantity)
        .insert("can_book", &(!ended && max_quantity > 0))
        .insert("ended", &ended);
    Ok(page.render(&state, "events/view.html")?.into_response())
}
