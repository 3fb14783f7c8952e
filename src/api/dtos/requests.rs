use serde::{Deserialize, Serialize};

/// Empty query-string values count as absent.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Deserialize, Serialize, Default)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[serde(skip_serializing)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Deserialize, Serialize, Default)]
pub struct RegisterForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub password_confirm: String,
}

/// Any mutating form that carries nothing but the CSRF token.
#[derive(Deserialize)]
pub struct CsrfForm {
    #[serde(default)]
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct BookForm {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub quantity: String,
}

#[derive(Deserialize, Default)]
pub struct CheckoutForm {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub cardholder_name: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvv: String,
    pub accept_terms: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct EventListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub price: Option<String>,
    pub sort: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct UserBookingsQuery {
    pub status: Option<String>,
    pub period: Option<String>,
}

#[derive(Deserialize, Serialize, Default)]
pub struct ProfileForm {
    #[serde(default, skip_serializing)]
    pub csrf_token: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Deserialize, Default)]
pub struct AdminEventQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct AdminUserQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, Serialize, Default)]
pub struct NewUserForm {
    #[serde(default, skip_serializing)]
    pub csrf_token: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub password_confirm: String,
}

#[derive(Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize, Default)]
pub struct AdminBookingQuery {
    pub status: Option<String>,
    pub period: Option<String>,
    pub search: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub format: Option<String>,
}

#[derive(Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default)]
    pub name: String,
}
