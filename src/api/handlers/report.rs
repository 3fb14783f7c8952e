use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::info;

use crate::api::dtos::requests::{non_empty, ReportQuery};
use crate::api::extractors::auth::AdminUser;
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::api::views::Page;
use crate::domain::models::booking::BookingFilter;
use crate::domain::models::event::AdminEventFilter;
use crate::domain::models::report::{ReportKind, ReportTable};
use crate::domain::models::user::UserFilter;
use crate::domain::services::csv_export::to_csv;
use crate::domain::services::periods::{days_window, report_range};
use crate::domain::services::reports;
use crate::error::AppError;
use crate::state::AppState;

const REPORTS_URL: &str = "/admin/reports";

fn range_of(state: &AppState, query: &ReportQuery) -> (NaiveDate, NaiveDate) {
    report_range(
        non_empty(&query.start_date),
        non_empty(&query.end_date),
        Utc::now(),
        state.config.tz(),
    )
}

pub async fn overview(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let tz = state.config.tz();
    let (start, end) = range_of(&state, &query);
    let (from, to) = days_window(start, end, tz);

    let bookings = state.booking_repo.list_admin(&BookingFilter {
        created_from: Some(from),
        created_to: Some(to),
        ..Default::default()
    }).await?;
    let categories = state.category_repo.list().await?;
    let report = reports::overview(&bookings, &categories, tz);

    let mut page = Page::load(&state, &cookies, Some(&admin.0)).await?;
    page.insert("report", &report)
        .insert("start_date", &start.to_string())
        .insert("end_date", &end.to_string())
        .insert("section", "reports");
    page.render(&state, "admin/reports.html")
}

async fn build_report(state: &AppState, kind: ReportKind, start: NaiveDate, end: NaiveDate, symbol: &str) -> Result<ReportTable, AppError> {
    let tz = state.config.tz();
    let (from, to) = days_window(start, end, tz);

    let table = match kind {
        ReportKind::Bookings | ReportKind::Revenue => {
            let bookings = state.booking_repo.list_admin(&BookingFilter {
                created_from: Some(from),
                created_to: Some(to),
                ..Default::default()
            }).await?;
            if kind == ReportKind::Bookings {
                reports::bookings_report(&bookings, tz, symbol)
            } else {
                reports::revenue_report(&bookings, tz, symbol)
            }
        }
        ReportKind::Events => {
            let events = state.event_repo.list_admin(&AdminEventFilter {
                created_from: Some(from),
                created_to: Some(to),
                ..Default::default()
            }).await?;
            reports::events_report(&events, tz, symbol)
        }
        ReportKind::Users => {
            let users = state.user_repo.list_with_stats(&UserFilter {
                created_from: Some(from),
                created_to: Some(to),
                ..Default::default()
            }).await?;
            reports::users_report(&users, tz)
        }
    };
    Ok(table)
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let Some(kind) = non_empty(&query.kind).and_then(ReportKind::parse) else {
        return Ok(redirect_with_flash(&cookies, REPORTS_URL, FlashKind::Danger, "Invalid report type"));
    };
    let (start, end) = range_of(&state, &query);
    let settings = state.settings().await?;
    let table = build_report(&state, kind, start, end, settings.currency_symbol()).await?;

    if non_empty(&query.format) == Some("csv") {
        let body = to_csv(&table.headers, &table.rows)?;
        let filename = format!("{}_report_{}.csv", kind.as_str(), Utc::now().format("%Y-%m-%d"));
        info!(report = kind.as_str(), rows = table.rows.len(), "Exported report");
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
            ],
            body,
        ).into_response());
    }

    let mut page = Page::load(&state, &cookies, Some(&admin.0)).await?;
    page.insert("table", &table)
        .insert("report_type", kind.as_str())
        .insert("start_date", &start.to_string())
        .insert("end_date", &end.to_string())
        .insert("section", "reports");
    Ok(page.render(&state, "admin/report.html")?.into_response())
}
