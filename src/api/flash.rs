//! One-shot messages carried across a redirect in a cookie.

use axum::response::{IntoResponse, Redirect, Response};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};
use tracing::debug;

const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

pub fn set_flash(cookies: &Cookies, kind: FlashKind, message: impl Into<String>) {
    let flash = Flash { kind, message: message.into() };
    let Ok(json) = serde_json::to_vec(&flash) else {
        return;
    };
    let mut cookie = Cookie::new(FLASH_COOKIE, URL_SAFE_NO_PAD.encode(json));
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookies.add(cookie);
}

/// Reads and clears the pending flash message, if any.
pub fn take_flash(cookies: &Cookies) -> Option<Flash> {
    let raw = cookies.get(FLASH_COOKIE)?.value().to_string();
    cookies.remove(Cookie::build((FLASH_COOKIE, "")).path("/").into());

    let decoded = URL_SAFE_NO_PAD.decode(raw.as_bytes()).ok()?;
    match serde_json::from_slice(&decoded) {
        Ok(flash) => Some(flash),
        Err(e) => {
            debug!("Dropping malformed flash cookie: {}", e);
            None
        }
    }
}

pub fn redirect_with_flash(cookies: &Cookies, to: &str, kind: FlashKind, message: impl Into<String>) -> Response {
    set_flash(cookies, kind, message);
    Redirect::to(to).into_response()
}
