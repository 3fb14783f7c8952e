use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::info;

use crate::api::dtos::requests::{non_empty, AdminUserQuery, NewUserForm, StatusForm};
use crate::api::extractors::auth::AdminUser;
use crate::api::flash::{redirect_with_flash, FlashKind};
use crate::api::views::Page;
use crate::domain::models::user::{NewUserParams, User, UserFilter, UserRole, UserStatus};
use crate::domain::services::auth_service::hash_password;
use crate::domain::services::validation::{validate_new_user, NewUserInput};
use crate::error::AppError;
use crate::state::AppState;

const USERS_URL: &str = "/admin/users";

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Query(query): Query<AdminUserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = UserFilter {
        search: non_empty(&query.search).map(str::to_string),
        role: non_empty(&query.role).and_then(|r| UserRole::try_from(r.to_string()).ok()),
        status: non_empty(&query.status).and_then(|s| UserStatus::try_from(s.to_string()).ok()),
        ..Default::default()
    };
    let users = state.user_repo.list_with_stats(&filter).await?;

    let mut page = Page::load(&state, &cookies, Some(&admin.0)).await?;
    page.insert("users", &users)
        .insert("query_search", non_empty(&query.search).unwrap_or_default())
        .insert("query_role", non_empty(&query.role).unwrap_or_default())
        .insert("query_status", non_empty(&query.status).unwrap_or_default())
        .insert("section", "users");
    page.render(&state, "admin/users.html")
}

async fn render_form(state: &AppState, cookies: &Cookies, admin: &AdminUser, form: &NewUserForm, errors: &[String]) -> Result<Response, AppError> {
    let mut page = Page::load(state, cookies, Some(&admin.0)).await?;
    page.insert("form", form).insert("errors", errors).insert("section", "users");
    Ok(page.render(state, "admin/user_form.html")?.into_response())
}

pub async fn new_user_page(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
) -> Result<Response, AppError> {
    let form = NewUserForm {
        role: UserRole::User.to_string(),
        status: UserStatus::Active.to_string(),
        ..Default::default()
    };
    render_form(&state, &cookies, &admin, &form, &[]).await
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Form(form): Form<NewUserForm>,
) -> Result<Response, AppError> {
    admin.verify_csrf(&form.csrf_token)?;

    let input = NewUserInput {
        first_name: &form.first_name,
        last_name: &form.last_name,
        email: &form.email,
        role: &form.role,
        status: &form.status,
        password: &form.password,
        password_confirm: &form.password_confirm,
    };
    let (role, status) = match validate_new_user(&input) {
        Ok(valid) => valid,
        Err(errors) => return render_form(&state, &cookies, &admin, &form, &errors).await,
    };

    let email = form.email.trim().to_lowercase();
    if state.user_repo.email_taken(&email, None).await? {
        let errors = vec!["Email already exists".to_string()];
        return render_form(&state, &cookies, &admin, &form, &errors).await;
    }

    let user = User::new(NewUserParams {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        email,
        phone: Some(form.phone.trim().to_string()).filter(|p| !p.is_empty()),
        password_hash: hash_password(&form.password)?,
        role,
        status,
        created_by: Some(admin.user.id.clone()),
    });
    let created = state.user_repo.create(&user).await?;
    info!(user_id = %created.id, created_by = %admin.user.id, "Admin created user");

    Ok(redirect_with_flash(&cookies, USERS_URL, FlashKind::Success, "User created successfully"))
}

pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    cookies: Cookies,
    Path(user_id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    admin.verify_csrf(&form.csrf_token)?;
    let Ok(status) = UserStatus::try_from(form.status.clone()) else {
        return Ok(redirect_with_flash(&cookies, USERS_URL, FlashKind::Danger, "Invalid status"));
    };

    if state.user_repo.update_status(&user_id, status).await? {
        info!(user_id = %user_id, status = %status, "User status changed");
        Ok(redirect_with_flash(&cookies, USERS_URL, FlashKind::Success, "User status updated successfully"))
    } else {
        Ok(redirect_with_flash(&cookies, USERS_URL, FlashKind::Danger, "User not found or cannot be modified"))
    }
}
