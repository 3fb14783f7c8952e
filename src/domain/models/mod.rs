pub mod auth;
pub mod booking;
pub mod category;
pub mod event;
pub mod job;
pub mod report;
pub mod setting;
pub mod user;

use thiserror::Error;

/// Raised when a stored status or role string does not match any known variant.
#[derive(Error, Debug)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
