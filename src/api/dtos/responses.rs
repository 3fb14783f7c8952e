use serde::Serialize;

use crate::domain::models::booking::BookingDetail;

/// One active filter in a "Showing results for" line.
#[derive(Serialize)]
pub struct ActiveFilter {
    pub label: &'static str,
    pub value: String,
}

#[derive(Serialize, Default)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_events: i64,
    pub total_bookings: i64,
}

/// Totals over a filtered back office booking list.
#[derive(Serialize, Default, Debug, PartialEq, Eq)]
pub struct BookingTotals {
    pub count: i64,
    pub confirmed_revenue_cents: i64,
    pub average_cents: i64,
}

impl BookingTotals {
    pub fn from_bookings(bookings: &[BookingDetail]) -> Self {
        let count = bookings.len() as i64;
        let confirmed_revenue_cents = bookings.iter()
            .filter(|b| b.booking.status == crate::domain::models::booking::BookingStatus::Confirmed)
            .map(|b| b.booking.total_cents)
            .sum();
        let average_cents = if count > 0 { confirmed_revenue_cents / count } else { 0 };
        Self { count, confirmed_revenue_cents, average_cents }
    }
}

#[derive(Serialize, Default)]
pub struct AccountStats {
    pub total_bookings: i64,
    pub total_spent_cents: i64,
}
