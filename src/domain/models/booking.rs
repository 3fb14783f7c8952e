use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;

use super::UnknownVariant;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    /// Pending and confirmed bookings count against event capacity.
    pub fn holds_seats(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(UnknownVariant { kind: "booking status", value }),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "refunded" => Ok(PaymentStatus::Refunded),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(UnknownVariant { kind: "payment status", value }),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Booking {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub quantity: i32,
    pub total_cents: i64,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    #[sqlx(try_from = "String")]
    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(event_id: String, user_id: String, quantity: i32, price_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            user_id,
            quantity,
            total_cents: quantity as i64 * price_cents,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn reference(&self) -> String {
        booking_reference(&self.id)
    }
}

/// Short public reference shown on tickets: first 8 hex characters of the id, upper-cased.
pub fn booking_reference(id: &str) -> String {
    id.chars().filter(|c| c.is_ascii_hexdigit()).take(8).collect::<String>().to_uppercase()
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct BookingLog {
    pub id: String,
    pub booking_id: String,
    pub action: String,
    pub actor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BookingLog {
    pub fn new(booking_id: &str, action: impl Into<String>, actor_id: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id: booking_id.to_string(),
            action: action.into(),
            actor_id: actor_id.map(str::to_string),
            created_at: Utc::now(),
        }
    }
}

/// Log entry with the actor's display name resolved.
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct BookingLogEntry {
    pub id: String,
    pub action: String,
    pub actor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Booking joined with its event, category and customer.
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct BookingDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: Booking,
    pub event_title: String,
    pub event_start_at: DateTime<Utc>,
    pub event_end_at: DateTime<Utc>,
    pub event_location: String,
    pub event_description: String,
    pub event_price_cents: i64,
    pub category_name: String,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_email: String,
}

impl BookingDetail {
    pub fn customer_name(&self) -> String {
        format!("{} {}", self.customer_first_name, self.customer_last_name)
    }
}

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Owner,
    Admin,
    /// The background sweep that expires unpaid bookings.
    System,
}

/// Checks the booking state machine. `Ok(true)` means the change needs a capacity re-check.
pub fn check_transition(from: BookingStatus, to: BookingStatus, actor: Actor) -> Result<bool, String> {
    use BookingStatus::*;
    let allowed = match (from, to) {
        (Pending, Confirmed) => matches!(actor, Actor::Owner | Actor::Admin),
        (Pending, Cancelled) => true,
        (Confirmed, Cancelled) => matches!(actor, Actor::Owner | Actor::Admin),
        (Cancelled, Confirmed) => actor == Actor::Admin,
        _ => false,
    };
    if !allowed {
        return Err(format!("Cannot change booking from {} to {}", from, to));
    }
    Ok(from == Cancelled && to == Confirmed)
}

/// Payment status implied by a booking status change.
pub fn payment_after(from: BookingStatus, to: BookingStatus, current: PaymentStatus) -> PaymentStatus {
    match (from, to) {
        (_, BookingStatus::Confirmed) => PaymentStatus::Completed,
        (BookingStatus::Confirmed, BookingStatus::Cancelled) => PaymentStatus::Refunded,
        (BookingStatus::Pending, BookingStatus::Cancelled) => PaymentStatus::Failed,
        _ => current,
    }
}

/// A status update applied atomically together with its audit log entry.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking_id: String,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub recheck_capacity: bool,
    pub log: BookingLog,
}

impl StatusChange {
    pub fn new(
        booking: &Booking,
        to: BookingStatus,
        actor: Actor,
        actor_id: Option<&str>,
        action: impl Into<String>,
    ) -> Result<Self, String> {
        let recheck_capacity = check_transition(booking.status, to, actor)?;
        let payment_status = payment_after(booking.status, to, booking.payment_status);
        let payment_date = (payment_status == PaymentStatus::Completed && booking.payment_date.is_none())
            .then(Utc::now);
        Ok(Self {
            booking_id: booking.id.clone(),
            from: booking.status,
            to,
            payment_status,
            payment_date,
            recheck_capacity,
            log: BookingLog::new(&booking.id, action, actor_id),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserPeriod {
    Upcoming,
    Past,
    ThisMonth,
}

impl UserPeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upcoming" => Some(UserPeriod::Upcoming),
            "past" => Some(UserPeriod::Past),
            "this-month" | "this_month" => Some(UserPeriod::ThisMonth),
            _ => None,
        }
    }
}

/// Filter for a customer's own bookings; ranges apply to the event start.
#[derive(Debug, Clone, Default)]
pub struct UserBookingFilter {
    pub status: Option<BookingStatus>,
    pub event_starts_from: Option<DateTime<Utc>>,
    pub event_starts_before: Option<DateTime<Utc>>,
    pub newest_event_first: bool,
    pub limit: Option<i64>,
}

/// Back office filter; ranges apply to the booking creation time.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub search: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}
