//! Renders notification emails from the shared template set.

use chrono_tz::Tz;
use tera::{Context, Tera};

use crate::domain::models::booking::BookingDetail;
use crate::domain::models::setting::SiteSettings;
use crate::domain::services::money::format_money;
use crate::error::AppError;

pub struct RenderedEmail {
    pub subject: String,
    pub html_body: String,
}

fn booking_context(detail: &BookingDetail, settings: &SiteSettings, base_url: &str, tz: Tz) -> Context {
    let fmt = |dt: chrono::DateTime<chrono::Utc>| dt.with_timezone(&tz).format("%A, %B %-d, %Y %H:%M").to_string();
    let mut context = Context::new();
    context.insert("site_name", &settings.site_name);
    context.insert("contact_email", &settings.contact_email);
    context.insert("customer_name", &detail.customer_name());
    context.insert("event_title", &detail.event_title);
    context.insert("event_location", &detail.event_location);
    context.insert("event_start", &fmt(detail.event_start_at));
    context.insert("event_end", &fmt(detail.event_end_at));
    context.insert("reference", &detail.booking.reference());
    context.insert("quantity", &detail.booking.quantity);
    context.insert("total", &format_money(detail.booking.total_cents, settings.currency_symbol()));
    context.insert("ticket_url", &format!("{}/user/bookings/{}/ticket", base_url.trim_end_matches('/'), detail.booking.id));
    context.insert("events_url", &format!("{}/events", base_url.trim_end_matches('/')));
    context
}

fn render(tera: &Tera, template: &str, context: &Context) -> Result<String, AppError> {
    tera.render(template, context).map_err(|e| {
        tracing::error!("Email template render error: {:?}", e);
        AppError::InternalWithMsg(format!("Tera render error: {:?}", e))
    })
}

pub fn booking_confirmed(tera: &Tera, detail: &BookingDetail, settings: &SiteSettings, base_url: &str, tz: Tz) -> Result<RenderedEmail, AppError> {
    let context = booking_context(detail, settings, base_url, tz);
    Ok(RenderedEmail {
        subject: format!("Your tickets for {} ({})", detail.event_title, detail.booking.reference()),
        html_body: render(tera, "emails/booking_confirmed.html", &context)?,
    })
}

pub fn event_cancelled(tera: &Tera, detail: &BookingDetail, settings: &SiteSettings, base_url: &str, tz: Tz) -> Result<RenderedEmail, AppError> {
    let context = booking_context(detail, settings, base_url, tz);
    Ok(RenderedEmail {
        subject: format!("Event cancelled: {}", detail.event_title),
        html_body: render(tera, "emails/event_cancelled.html", &context)?,
    })
}
