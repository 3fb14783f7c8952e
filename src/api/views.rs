//! Template loading and the shared page context.

use std::collections::HashMap;

use axum::response::Html;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use tera::{Context, Tera};
use tower_cookies::Cookies;
use tracing::error;

use crate::api::extractors::auth::AuthUser;
use crate::api::flash::take_flash;
use crate::domain::models::setting::SiteSettings;
use crate::domain::services::money::format_money;
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_DATETIME_FORMAT: &str = "%b %-d, %Y %H:%M";

/// Builds the template set. `tz` drives the `local` filter.
pub fn build_templates(tz: Tz) -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../templates/base.html")),
        ("macros.html", include_str!("../templates/macros.html")),
        ("home.html", include_str!("../templates/home.html")),
        ("auth/login.html", include_str!("../templates/auth/login.html")),
        ("auth/register.html", include_str!("../templates/auth/register.html")),
        ("events/list.html", include_str!("../templates/events/list.html")),
        ("events/view.html", include_str!("../templates/events/view.html")),
        ("bookings/checkout.html", include_str!("../templates/bookings/checkout.html")),
        ("bookings/confirmation.html", include_str!("../templates/bookings/confirmation.html")),
        ("user/dashboard.html", include_str!("../templates/user/dashboard.html")),
        ("user/bookings.html", include_str!("../templates/user/bookings.html")),
        ("user/ticket.html", include_str!("../templates/user/ticket.html")),
        ("user/profile.html", include_str!("../templates/user/profile.html")),
        ("admin/layout.html", include_str!("../templates/admin/layout.html")),
        ("admin/dashboard.html", include_str!("../templates/admin/dashboard.html")),
        ("admin/events.html", include_str!("../templates/admin/events.html")),
        ("admin/event_form.html", include_str!("../templates/admin/event_form.html")),
        ("admin/users.html", include_str!("../templates/admin/users.html")),
        ("admin/user_form.html", include_str!("../templates/admin/user_form.html")),
        ("admin/bookings.html", include_str!("../templates/admin/bookings.html")),
        ("admin/booking_view.html", include_str!("../templates/admin/booking_view.html")),
        ("admin/reports.html", include_str!("../templates/admin/reports.html")),
        ("admin/report.html", include_str!("../templates/admin/report.html")),
        ("admin/settings.html", include_str!("../templates/admin/settings.html")),
        ("admin/categories.html", include_str!("../templates/admin/categories.html")),
        ("emails/booking_confirmed.html", include_str!("../templates/emails/booking_confirmed.html")),
        ("emails/event_cancelled.html", include_str!("../templates/emails/event_cancelled.html")),
    ])?;

    tera.register_filter("money", money_filter);
    tera.register_filter("local", move |value: &Value, args: &HashMap<String, Value>| local_filter(value, args, tz));
    Ok(tera)
}

/// `{{ cents | money(symbol="$") }}`
fn money_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let cents = value.as_i64()
        .ok_or_else(|| tera::Error::msg(format!("money filter expects integer cents, got {}", value)))?;
    let symbol = args.get("symbol").and_then(Value::as_str).unwrap_or("$");
    Ok(Value::String(format_money(cents, symbol)))
}

/// `{{ timestamp | local(format="%Y-%m-%d") }}` renders a UTC timestamp in the site timezone.
fn local_filter(value: &Value, args: &HashMap<String, Value>, tz: Tz) -> tera::Result<Value> {
    let format = args.get("format").and_then(Value::as_str).unwrap_or(DEFAULT_DATETIME_FORMAT);
    let Some(raw) = value.as_str() else {
        return Ok(Value::String(String::new()));
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Value::String(dt.with_timezone(&tz).format(format).to_string()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Value::String(date.format(format).to_string()));
    }
    Err(tera::Error::msg(format!("local filter cannot parse {}", raw)))
}

/// A page being assembled: the shared layout context plus the current settings.
pub struct Page {
    pub context: Context,
    pub settings: SiteSettings,
}

impl Page {
    pub async fn load(state: &AppState, cookies: &Cookies, viewer: Option<&AuthUser>) -> Result<Self, AppError> {
        let settings = state.settings().await?;
        let mut context = Context::new();
        context.insert("site", &settings);
        context.insert("currency_symbol", settings.currency_symbol());
        context.insert("flash", &take_flash(cookies));
        context.insert("current_user", &viewer.map(|v| &v.user));
        context.insert("is_admin", &viewer.is_some_and(|v| v.user.is_admin()));
        context.insert("csrf_token", viewer.map(|v| v.csrf_token.as_str()).unwrap_or_default());
        context.insert("errors", &Vec::<String>::new());
        Ok(Self { context, settings })
    }

    pub fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> &mut Self {
        self.context.insert(key, value);
        self
    }

    pub fn render(&self, state: &AppState, template: &str) -> Result<Html<String>, AppError> {
        state.templates.render(template, &self.context)
            .map(Html)
            .map_err(|e| {
                error!("Template render error in {}: {:?}", template, e);
                AppError::InternalWithMsg(format!("Tera render error: {:?}", e))
            })
    }
}
