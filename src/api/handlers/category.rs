use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Form,
};
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::info;

use crate::api::dtos::requests::CategoryForm;
use crate::api::extractors::auth::AdminUser;
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::api::views::Page;
use crate::domain::models::category::Category;
use crate::error::AppError;
use crate::state::AppState;

const CATEGORIES_URL: &str = "/admin/categories";
const MAX_NAME_LEN: usize = 50;

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
) -> Result<impl IntoResponse, AppError> {
    let categories = state.category_repo.list_with_counts(None).await?;

    let mut page = Page::load(&state, &cookies, Some(&admin.0)).await?;
    page.insert("categories", &categories).insert("section", "categories");
    page.render(&state, "admin/categories.html")
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    admin.verify_csrf(&form.csrf_token)?;

    let name = form.name.trim();
    if name.is_empty() {
        return Ok(redirect_with_flash(&cookies, CATEGORIES_URL, FlashKind::Danger, "Category name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Ok(redirect_with_flash(&cookies, CATEGORIES_URL, FlashKind::Danger, "Category name must be 50 characters or less"));
    }

    match state.category_repo.create(&Category::new(name.to_string())).await {
        Ok(category) => {
            info!(category_id = %category.id, name = %category.name, "Category created");
            Ok(redirect_with_flash(&cookies, CATEGORIES_URL, FlashKind::Success, "Category created successfully"))
        }
        Err(e) if e.is_unique_violation() => {
            Ok(redirect_with_flash(&cookies, CATEGORIES_URL, FlashKind::Danger, "Category already exists"))
        }
        Err(e) => Err(e),
    }
}
