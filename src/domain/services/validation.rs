//! Form validation. Every check appends to one error list so a form can show all problems at once.

use chrono_tz::Tz;

use crate::domain::models::event::{EventDraft, EventStatus};
use crate::domain::models::user::{UserRole, UserStatus};
use crate::domain::services::{money::parse_amount, periods::parse_local_datetime};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// 99,999,999.99 in cents; keeps booking totals and revenue sums far from overflow.
pub const MAX_PRICE_CENTS: i64 = 9_999_999_999;

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

fn check_names(first: &str, last: &str, errors: &mut Vec<String>) {
    if first.trim().is_empty() {
        errors.push("First name is required".to_string());
    }
    if last.trim().is_empty() {
        errors.push("Last name is required".to_string());
    }
}

fn check_new_password(password: &str, confirm: &str, errors: &mut Vec<String>) {
    if password.is_empty() {
        errors.push("Password is required".to_string());
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push("Password must be at least 8 characters long".to_string());
    }
    if password != confirm {
        errors.push("Passwords do not match".to_string());
    }
}

pub fn validate_registration(first: &str, last: &str, email: &str, password: &str, confirm: &str) -> Vec<String> {
    let mut errors = Vec::new();
    check_names(first, last, &mut errors);
    if !is_valid_email(email) {
        errors.push("Please enter a valid email address".to_string());
    }
    check_new_password(password, confirm, &mut errors);
    errors
}

pub fn validate_profile(first: &str, last: &str, email: &str) -> Vec<String> {
    let mut errors = Vec::new();
    check_names(first, last, &mut errors);
    if !is_valid_email(email) {
        errors.push("Valid email is required".to_string());
    }
    errors
}

pub fn validate_password_change(current: &str, new: &str, confirm: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if current.is_empty() {
        errors.push("Current password is required".to_string());
    }
    check_new_password(new, confirm, &mut errors);
    errors
}

pub struct NewUserInput<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    pub status: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
}

pub fn validate_new_user(input: &NewUserInput<'_>) -> Result<(UserRole, UserStatus), Vec<String>> {
    let mut errors = Vec::new();
    check_names(input.first_name, input.last_name, &mut errors);
    if !is_valid_email(input.email) {
        errors.push("Valid email address is required".to_string());
    }
    check_new_password(input.password, input.password_confirm, &mut errors);
    let role = UserRole::try_from(input.role.to_string()).ok();
    if role.is_none() {
        errors.push("Invalid role selected".to_string());
    }
    let status = UserStatus::try_from(input.status.to_string()).ok();
    if status.is_none() {
        errors.push("Invalid status selected".to_string());
    }
    match (role, status) {
        (Some(role), Some(status)) if errors.is_empty() => Ok((role, status)),
        _ => Err(errors),
    }
}

/// Raw event form values as submitted.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
    pub location: String,
    pub capacity: String,
    pub price: String,
    pub status: String,
}

/// Validates an event form. `category_exists` reports whether the chosen category is real.
pub fn validate_event(input: &EventInput, category_exists: bool, tz: Tz) -> Result<EventDraft, Vec<String>> {
    let mut errors = Vec::new();

    let title = input.title.trim();
    if title.is_empty() {
        errors.push("Title is required".to_string());
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.push("Title must be 100 characters or less".to_string());
    }
    if input.description.trim().is_empty() {
        errors.push("Description is required".to_string());
    }
    if input.category_id.trim().is_empty() || !category_exists {
        errors.push("Please select a category".to_string());
    }

    let start_at = if input.start_date.trim().is_empty() || input.start_time.trim().is_empty() {
        errors.push("Start date and time are required".to_string());
        None
    } else {
        let parsed = parse_local_datetime(&input.start_date, &input.start_time, tz);
        if parsed.is_none() {
            errors.push("Start date and time are invalid".to_string());
        }
        parsed
    };
    let end_at = if input.end_date.trim().is_empty() || input.end_time.trim().is_empty() {
        errors.push("End date and time are required".to_string());
        None
    } else {
        let parsed = parse_local_datetime(&input.end_date, &input.end_time, tz);
        if parsed.is_none() {
            errors.push("End date and time are invalid".to_string());
        }
        parsed
    };
    if let (Some(start), Some(end)) = (start_at, end_at)
        && end <= start
    {
        errors.push("End date must be after start date".to_string());
    }

    if input.location.trim().is_empty() {
        errors.push("Location is required".to_string());
    }
    let capacity = input.capacity.trim().parse::<i32>().ok().filter(|c| *c >= 1);
    if capacity.is_none() {
        errors.push("Capacity must be at least 1".to_string());
    }
    let price_cents = parse_amount(&input.price);
    match price_cents {
        None => errors.push("Price must be a valid amount of 0 or more".to_string()),
        Some(cents) if cents > MAX_PRICE_CENTS => errors.push("Price must be 99,999,999.99 or less".to_string()),
        Some(_) => {}
    }
    let price_cents = price_cents.filter(|cents| *cents <= MAX_PRICE_CENTS);
    let status = EventStatus::try_from(input.status.trim().to_string()).ok();
    if status.is_none() {
        errors.push("Invalid status selected".to_string());
    }

    match (start_at, end_at, capacity, price_cents, status) {
        (Some(start_at), Some(end_at), Some(capacity), Some(price_cents), Some(status)) if errors.is_empty() => {
            Ok(EventDraft {
                title: title.to_string(),
                description: input.description.trim().to_string(),
                category_id: input.category_id.trim().to_string(),
                start_at,
                end_at,
                location: input.location.trim().to_string(),
                capacity,
                price_cents,
                status,
            })
        }
        _ => Err(errors),
    }
}

/// Checks an uploaded event image and returns the file extension to store it under.
pub fn check_image(filename: &str, content_type: Option<&str>, size: usize) -> Result<&'static str, String> {
    let ext = filename.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()).unwrap_or_default();
    let by_ext = match ext.as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "gif" => Some("gif"),
        _ => None,
    };
    let by_type = match content_type {
        Some("image/jpeg") | Some("image/jpg") => Some("jpg"),
        Some("image/png") => Some("png"),
        Some("image/gif") => Some("gif"),
        None => by_ext,
        _ => None,
    };
    let ext = match (by_ext, by_type) {
        (Some(a), Some(b)) if a == b => a,
        _ => return Err("Invalid image type. Please upload JPG, PNG, or GIF".to_string()),
    };
    if size > MAX_IMAGE_BYTES {
        return Err("Image size must be less than 5MB".to_string());
    }
    Ok(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_input() -> EventInput {
        EventInput {
            title: "Jazz Night".into(),
            description: "Live music".into(),
            category_id: "c1".into(),
            start_date: "2030-05-01".into(),
            start_time: "19:00".into(),
            end_date: "2030-05-01".into(),
            end_time: "22:00".into(),
            location: "Blue Hall".into(),
            capacity: "120".into(),
            price: "25.00".into(),
            status: "published".into(),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example@x.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@@x.com"));
    }

    #[test]
    fn registration_collects_every_error() {
        let errors = validate_registration("", " ", "nope", "short", "different");
        assert_eq!(errors.len(), 5);
        assert!(validate_registration("Ana", "Lee", "ana@example.com", "longenough", "longenough").is_empty());
    }

    #[test]
    fn event_form_happy_path() {
        let draft = validate_event(&event_input(), true, chrono_tz::UTC).unwrap();
        assert_eq!(draft.capacity, 120);
        assert_eq!(draft.price_cents, 2_500);
        assert_eq!(draft.status, EventStatus::Published);
    }

    #[test]
    fn event_end_must_follow_start() {
        let mut input = event_input();
        input.end_time = "18:00".into();
        let errors = validate_event(&input, true, chrono_tz::UTC).unwrap_err();
        assert_eq!(errors, vec!["End date must be after start date".to_string()]);
    }

    #[test]
    fn event_title_length_and_numbers() {
        let mut input = event_input();
        input.title = "x".repeat(101);
        input.capacity = "0".into();
        input.price = "-5".into();
        input.status = "archived".into();
        let errors = validate_event(&input, false, chrono_tz::UTC).unwrap_err();
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn price_has_an_upper_bound() {
        let mut input = event_input();
        input.price = "99999999.99".into();
        assert_eq!(validate_event(&input, true, chrono_tz::UTC).unwrap().price_cents, MAX_PRICE_CENTS);

        input.price = "92233720368547758.07".into();
        let errors = validate_event(&input, true, chrono_tz::UTC).unwrap_err();
        assert_eq!(errors, vec!["Price must be 99,999,999.99 or less".to_string()]);

        input.price = "100000000".into();
        assert!(validate_event(&input, true, chrono_tz::UTC).is_err());
    }

    #[test]
    fn image_checks() {
        assert_eq!(check_image("poster.JPG", Some("image/jpeg"), 1024), Ok("jpg"));
        assert!(check_image("poster.png", Some("image/jpeg"), 1024).is_err());
        assert!(check_image("script.php", Some("image/png"), 10).is_err());
        assert!(check_image("big.gif", Some("image/gif"), MAX_IMAGE_BYTES + 1).is_err());
    }
}
