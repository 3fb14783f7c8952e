use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{
    account, admin_booking, admin_dashboard, admin_event, admin_user, auth, booking, category, event, health, home,
    report, setting,
};
use tower_http::{
    services::ServeDir,
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

/// Multipart event forms carry an image of up to 5 MB plus the text fields.
const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_dir = state.config.upload_dir.clone();

    Router::new()
        .route("/health", get(health::health_check))

        // Public
        .route("/", get(home::home))
        .route("/events", get(event::list_events))
        .route("/events/{id}", get(event::view_event))
        .route("/events/{id}/book", post(booking::book_event))

        // Auth
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))

        // Checkout
        .route("/bookings/{id}/checkout", get(booking::checkout_page).post(booking::checkout))
        .route("/bookings/{id}/confirmation", get(booking::confirmation))
        .route("/bookings/{id}/cancel", post(booking::cancel_booking))

        // User area
        .route("/user/dashboard", get(account::dashboard))
        .route("/user/bookings", get(account::bookings))
        .route("/user/bookings/{id}/ticket", get(account::ticket))
        .route("/user/bookings/{id}/calendar.ics", get(account::ticket_calendar))
        .route("/user/profile", get(account::profile).post(account::update_profile))
        .route("/user/password", post(account::change_password))

        // Admin
        .route("/admin", get(admin_dashboard::dashboard))
        .route("/admin/events", get(admin_event::list_events))
        .route("/admin/events/new", get(admin_event::new_event_page).post(admin_event::create_event))
        .route("/admin/events/{id}/edit", get(admin_event::edit_event_page).post(admin_event::update_event))
        .route("/admin/events/{id}/delete", post(admin_event::delete_event))
        .route("/admin/users", get(admin_user::list_users))
        .route("/admin/users/new", get(admin_user::new_user_page).post(admin_user::create_user))
        .route("/admin/users/{id}/status", post(admin_user::update_user_status))
        .route("/admin/bookings", get(admin_booking::list_bookings))
        .route("/admin/bookings/export", get(admin_booking::export_bookings))
        .route("/admin/bookings/{id}", get(admin_booking::view_booking))
        .route("/admin/bookings/{id}/status", post(admin_booking::update_booking_status))
        .route("/admin/reports", get(report::overview))
        .route("/admin/reports/generate", get(report::generate))
        .route("/admin/settings", get(setting::settings_page).post(setting::update_settings))
        .route("/admin/categories", get(category::list_categories).post(category::create_category))

        // Static files
        .nest_service("/static", ServeDir::new("static"))
        .nest_service("/uploads", ServeDir::new(upload_dir))

        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
