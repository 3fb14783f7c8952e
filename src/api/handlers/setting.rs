use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Form,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::info;

use crate::api::extractors::auth::AdminUser;
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::api::views::Page;
use crate::domain::models::setting::{validate_update, SiteSettings, CURRENCIES};
use crate::error::AppError;
use crate::state::AppState;

const SETTINGS_URL: &str = "/admin/settings";

async fn render_settings(state: &AppState, cookies: &Cookies, admin: &AdminUser, errors: &[String]) -> Result<Response, AppError> {
    let mut page = Page::load(state, cookies, Some(&admin.0)).await?;
    let current: SiteSettings = page.settings.clone();
    page.insert("settings", &current)
        .insert("currencies", CURRENCIES)
        .insert("smtp_password_set", &!current.smtp_password.is_empty())
        .insert("payment_api_key_set", &!current.payment_api_key.is_empty())
        .insert("payment_api_secret_set", &!current.payment_api_secret.is_empty())
        .insert("errors", errors)
        .insert("section", "settings");
    Ok(page.render(state, "admin/settings.html")?.into_response())
}

pub async fn settings_page(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
) -> Result<Response, AppError> {
    render_settings(&state, &cookies, &admin, &[]).await
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    admin.verify_csrf(form.get("csrf_token").map(String::as_str).unwrap_or_default())?;

    let pairs = match validate_update(&form) {
        Ok(pairs) => pairs,
        Err(errors) => return render_settings(&state, &cookies, &admin, &errors).await,
    };
    state.setting_repo.upsert_many(&pairs, &admin.user.id).await?;
    info!(admin_id = %admin.user.id, keys = pairs.len(), "Settings updated");

    Ok(redirect_with_flash(&cookies, SETTINGS_URL, FlashKind::Success, "Settings updated successfully"))
}
