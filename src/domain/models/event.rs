use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;

use super::UnknownVariant;

/// At or below this many remaining seats an event shows a "few left" notice.
pub const FEW_SEATS_LEFT: i64 = 10;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
}

impl EventStatus {
    pub const ALL: [EventStatus; 3] = [EventStatus::Draft, EventStatus::Published, EventStatus::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<String> for EventStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "cancelled" => Ok(EventStatus::Cancelled),
            _ => Err(UnknownVariant { kind: "event status", value }),
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub image_url: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub location: String,
    pub capacity: i32,
    pub price_cents: i64,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated field values shared by create and edit.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub category_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub location: String,
    pub capacity: i32,
    pub price_cents: i64,
    pub status: EventStatus,
}

impl Event {
    pub fn new(draft: EventDraft, image_url: Option<String>, created_by: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            description: draft.description,
            category_id: draft.category_id,
            image_url,
            start_at: draft.start_at,
            end_at: draft.end_at,
            location: draft.location,
            capacity: draft.capacity,
            price_cents: draft.price_cents,
            status: draft.status,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: EventDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.category_id = draft.category_id;
        self.start_at = draft.start_at;
        self.end_at = draft.end_at;
        self.location = draft.location;
        self.capacity = draft.capacity;
        self.price_cents = draft.price_cents;
        self.status = draft.status;
        self.updated_at = Utc::now();
    }
}

/// Seats still on sale given the seats held by pending and confirmed bookings.
pub fn seats_available(capacity: i32, held: i64) -> i64 {
    (capacity as i64 - held).max(0)
}

/// An event joined with its category, creator and booking figures.
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct EventListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub category_name: String,
    pub creator_name: String,
    /// Seats held by pending and confirmed bookings.
    pub held_seats: i64,
    /// Bookings of any status.
    pub booking_count: i64,
    /// Revenue from confirmed bookings.
    pub revenue_cents: i64,
}

impl EventListing {
    pub fn available(&self) -> i64 {
        seats_available(self.event.capacity, self.held_seats)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBand {
    Free,
    Under50,
    From50To100,
    Over100,
}

impl PriceBand {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(PriceBand::Free),
            "under-50" | "under_50" => Some(PriceBand::Under50),
            "50-100" | "50_100" => Some(PriceBand::From50To100),
            "100-plus" | "100_plus" => Some(PriceBand::Over100),
            _ => None,
        }
    }

    /// Inclusive lower and exclusive upper bound in cents.
    pub fn bounds(&self) -> (i64, Option<i64>) {
        match self {
            PriceBand::Free => (0, Some(1)),
            PriceBand::Under50 => (1, Some(5_001)),
            PriceBand::From50To100 => (5_001, Some(10_001)),
            PriceBand::Over100 => (10_001, None),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriceBand::Free => "Free",
            PriceBand::Under50 => "Under 50",
            PriceBand::From50To100 => "50 to 100",
            PriceBand::Over100 => "Over 100",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventSort {
    #[default]
    DateAsc,
    DateDesc,
    PriceAsc,
    PriceDesc,
}

impl EventSort {
    pub fn parse(value: &str) -> Self {
        match value {
            "date_desc" => EventSort::DateDesc,
            "price_asc" => EventSort::PriceAsc,
            "price_desc" => EventSort::PriceDesc,
            _ => EventSort::DateAsc,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            EventSort::DateAsc => "e.start_at ASC",
            EventSort::DateDesc => "e.start_at DESC",
            EventSort::PriceAsc => "e.price_cents ASC, e.start_at ASC",
            EventSort::PriceDesc => "e.price_cents DESC, e.start_at ASC",
        }
    }
}

/// Public catalogue filter. Only published events that have not ended are listed.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub starts_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub price: Option<PriceBand>,
    pub sort: EventSort,
}

/// Back office filter; every status is visible.
#[derive(Debug, Clone, Default)]
pub struct AdminEventFilter {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub status: Option<EventStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_never_negative() {
        assert_eq!(seats_available(10, 4), 6);
        assert_eq!(seats_available(10, 10), 0);
        assert_eq!(seats_available(5, 8), 0);
    }

    #[test]
    fn price_bands_partition_prices() {
        let band_of = |cents: i64| {
            [PriceBand::Free, PriceBand::Under50, PriceBand::From50To100, PriceBand::Over100]
                .into_iter()
                .filter(|b| {
                    let (lo, hi) = b.bounds();
                    cents >= lo && hi.is_none_or(|h| cents < h)
                })
                .count()
        };
        for cents in [0, 1, 4_999, 5_000, 10_000, 10_001, 99_999] {
            assert_eq!(band_of(cents), 1, "price {cents} must fall in exactly one band");
        }
    }

    #[test]
    fn unknown_sort_defaults_to_date() {
        assert_eq!(EventSort::parse("nonsense"), EventSort::DateAsc);
        assert_eq!(EventSort::parse("price_desc"), EventSort::PriceDesc);
    }
}
