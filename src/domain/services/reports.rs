//! Report aggregation over rows already narrowed to the requested date range.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::domain::models::booking::{BookingDetail, BookingStatus};
use crate::domain::models::category::Category;
use crate::domain::models::event::EventListing;
use crate::domain::models::report::{CategoryStat, DailyRevenue, ReportKind, ReportOverview, ReportTable, SummaryItem};
use crate::domain::models::user::{UserRole, UserStatus, UserSummary};
use crate::domain::services::money::{format_decimal, format_money};

fn local(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

fn item(label: &str, value: impl ToString) -> SummaryItem {
    SummaryItem { label: label.to_string(), value: value.to_string() }
}

fn confirmed(bookings: &[BookingDetail]) -> impl Iterator<Item = &BookingDetail> {
    bookings.iter().filter(|b| b.booking.status == BookingStatus::Confirmed)
}

/// Confirmed revenue per local day, oldest first.
pub fn daily_revenue(bookings: &[BookingDetail], tz: Tz) -> Vec<DailyRevenue> {
    let mut days: BTreeMap<NaiveDate, (i64, i64, HashSet<&str>)> = BTreeMap::new();
    for b in confirmed(bookings) {
        let day = b.booking.created_at.with_timezone(&tz).date_naive();
        let entry = days.entry(day).or_default();
        entry.0 += 1;
        entry.1 += b.booking.total_cents;
        entry.2.insert(b.booking.user_id.as_str());
    }
    days.into_iter()
        .map(|(date, (bookings, revenue_cents, customers))| DailyRevenue {
            date,
            bookings,
            revenue_cents,
            unique_customers: customers.len() as i64,
        })
        .collect()
}

pub fn overview(bookings: &[BookingDetail], categories: &[Category], tz: Tz) -> ReportOverview {
    let mut customers = HashSet::new();
    let mut report = ReportOverview::default();
    let mut per_category: HashMap<&str, (i64, i64)> = HashMap::new();

    for b in confirmed(bookings) {
        report.total_bookings += 1;
        report.total_revenue_cents += b.booking.total_cents;
        report.total_tickets += b.booking.quantity as i64;
        customers.insert(b.booking.user_id.as_str());
        let entry = per_category.entry(b.category_name.as_str()).or_default();
        entry.0 += 1;
        entry.1 += b.booking.total_cents;
    }
    report.unique_customers = customers.len() as i64;

    let mut stats: Vec<CategoryStat> = categories
        .iter()
        .map(|c| {
            let (booking_count, revenue_cents) = per_category.get(c.name.as_str()).copied().unwrap_or_default();
            CategoryStat { name: c.name.clone(), booking_count, revenue_cents }
        })
        .collect();
    stats.sort_by(|a, b| b.revenue_cents.cmp(&a.revenue_cents).then_with(|| a.name.cmp(&b.name)));
    report.categories = stats;
    report.daily = daily_revenue(bookings, tz);
    report
}

pub fn bookings_report(bookings: &[BookingDetail], tz: Tz, symbol: &str) -> ReportTable {
    let count = |s: BookingStatus| bookings.iter().filter(|b| b.booking.status == s).count();
    let revenue: i64 = confirmed(bookings).map(|b| b.booking.total_cents).sum();

    ReportTable {
        kind: ReportKind::Bookings,
        title: ReportKind::Bookings.title().to_string(),
        summary: vec![
            item("Total Bookings", bookings.len()),
            item("Confirmed", count(BookingStatus::Confirmed)),
            item("Cancelled", count(BookingStatus::Cancelled)),
            item("Total Revenue", format_money(revenue, symbol)),
        ],
        headers: ["ID", "Event", "Customer", "Email", "Quantity", "Amount", "Status", "Date"]
            .map(String::from)
            .to_vec(),
        rows: bookings
            .iter()
            .map(|b| {
                vec![
                    b.booking.reference(),
                    b.event_title.clone(),
                    b.customer_name(),
                    b.customer_email.clone(),
                    b.booking.quantity.to_string(),
                    format_decimal(b.booking.total_cents),
                    b.booking.status.to_string(),
                    local(b.booking.created_at, tz),
                ]
            })
            .collect(),
    }
}

pub fn events_report(events: &[EventListing], tz: Tz, symbol: &str) -> ReportTable {
    use crate::domain::models::event::EventStatus;
    let count = |s: EventStatus| events.iter().filter(|e| e.event.status == s).count();
    let capacity: i64 = events.iter().map(|e| e.event.capacity as i64).sum();
    let revenue: i64 = events.iter().map(|e| e.revenue_cents).sum();

    ReportTable {
        kind: ReportKind::Events,
        title: ReportKind::Events.title().to_string(),
        summary: vec![
            item("Total Events", events.len()),
            item("Published", count(EventStatus::Published)),
            item("Cancelled", count(EventStatus::Cancelled)),
            item("Total Capacity", capacity),
            item("Confirmed Revenue", format_money(revenue, symbol)),
        ],
        headers: ["ID", "Title", "Category", "Start Date", "Capacity", "Price", "Bookings", "Revenue", "Status"]
            .map(String::from)
            .to_vec(),
        rows: events
            .iter()
            .map(|e| {
                vec![
                    e.event.id.clone(),
                    e.event.title.clone(),
                    e.category_name.clone(),
                    local(e.event.start_at, tz),
                    e.event.capacity.to_string(),
                    format_decimal(e.event.price_cents),
                    e.booking_count.to_string(),
                    format_decimal(e.revenue_cents),
                    e.event.status.to_string(),
                ]
            })
            .collect(),
    }
}

pub fn users_report(users: &[UserSummary], tz: Tz) -> ReportTable {
    let admins = users.iter().filter(|u| u.user.role == UserRole::Admin).count();
    let active = users.iter().filter(|u| u.user.status == UserStatus::Active).count();
    let banned = users.iter().filter(|u| u.user.status == UserStatus::Banned).count();

    let mut sorted: Vec<&UserSummary> = users.iter().collect();
    sorted.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));

    ReportTable {
        kind: ReportKind::Users,
        title: ReportKind::Users.title().to_string(),
        summary: vec![
            item("Total Users", users.len()),
            item("Admins", admins),
            item("Active", active),
            item("Banned", banned),
        ],
        headers: ["ID", "Name", "Email", "Role", "Status", "Total Bookings", "Total Spent", "Joined Date"]
            .map(String::from)
            .to_vec(),
        rows: sorted
            .into_iter()
            .map(|u| {
                vec![
                    u.user.id.clone(),
                    u.user.full_name(),
                    u.user.email.clone(),
                    u.user.role.to_string(),
                    u.user.status.to_string(),
                    u.booking_count.to_string(),
                    format_decimal(u.total_spent),
                    local(u.user.created_at, tz),
                ]
            })
            .collect(),
    }
}

pub fn revenue_report(bookings: &[BookingDetail], tz: Tz, symbol: &str) -> ReportTable {
    let customers: HashSet<&str> = confirmed(bookings).map(|b| b.booking.user_id.as_str()).collect();
    let transactions = confirmed(bookings).count() as i64;
    let revenue: i64 = confirmed(bookings).map(|b| b.booking.total_cents).sum();
    let average = if transactions > 0 { revenue / transactions } else { 0 };

    let mut daily = daily_revenue(bookings, tz);
    daily.reverse();

    ReportTable {
        kind: ReportKind::Revenue,
        title: ReportKind::Revenue.title().to_string(),
        summary: vec![
            item("Unique Customers", customers.len()),
            item("Transactions", transactions),
            item("Total Revenue", format_money(revenue, symbol)),
            item("Average Transaction", format_money(average, symbol)),
        ],
        headers: ["Date", "Transactions", "Revenue", "Unique Customers"].map(String::from).to_vec(),
        rows: daily
            .into_iter()
            .map(|d| {
                vec![
                    d.date.to_string(),
                    d.bookings.to_string(),
                    format_decimal(d.revenue_cents),
                    d.unique_customers.to_string(),
                ]
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::booking::{Booking, PaymentStatus};

    fn detail(user: &str, category: &str, status: BookingStatus, cents: i64, created: &str) -> BookingDetail {
        let created_at = DateTime::parse_from_rfc3339(created).unwrap().with_timezone(&Utc);
        let mut booking = Booking::new("e1".into(), user.into(), 2, cents / 2);
        booking.status = status;
        booking.payment_status = PaymentStatus::Completed;
        booking.created_at = created_at;
        BookingDetail {
            booking,
            event_title: "Show".into(),
            event_start_at: created_at,
            event_end_at: created_at,
            event_location: "Hall".into(),
            event_description: "".into(),
            event_price_cents: cents / 2,
            category_name: category.into(),
            customer_first_name: "Ana".into(),
            customer_last_name: "Lee".into(),
            customer_email: "ana@example.com".into(),
        }
    }

    fn categories() -> Vec<Category> {
        vec![Category::new("Music".into()), Category::new("Art".into())]
    }

    #[test]
    fn overview_counts_only_confirmed() {
        let rows = vec![
            detail("u1", "Music", BookingStatus::Confirmed, 2_000, "2025-05-01T10:00:00Z"),
            detail("u1", "Music", BookingStatus::Confirmed, 4_000, "2025-05-02T10:00:00Z"),
            detail("u2", "Art", BookingStatus::Cancelled, 9_000, "2025-05-02T11:00:00Z"),
        ];
        let o = overview(&rows, &categories(), chrono_tz::UTC);
        assert_eq!(o.total_bookings, 2);
        assert_eq!(o.total_revenue_cents, 6_000);
        assert_eq!(o.total_tickets, 4);
        assert_eq!(o.unique_customers, 1);
        assert_eq!(o.categories[0], CategoryStat { name: "Music".into(), booking_count: 2, revenue_cents: 6_000 });
        assert_eq!(o.categories[1].booking_count, 0);
        assert_eq!(o.daily.len(), 2);
    }

    #[test]
    fn daily_revenue_groups_by_local_day() {
        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        // Both fall on 2025-05-02 in Tokyo.
        let rows = vec![
            detail("u1", "Music", BookingStatus::Confirmed, 1_000, "2025-05-01T16:00:00Z"),
            detail("u2", "Music", BookingStatus::Confirmed, 1_000, "2025-05-02T10:00:00Z"),
        ];
        let daily = daily_revenue(&rows, tz);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].date.to_string(), "2025-05-02");
        assert_eq!(daily[0].unique_customers, 2);
    }

    #[test]
    fn revenue_report_lists_newest_day_first() {
        let rows = vec![
            detail("u1", "Music", BookingStatus::Confirmed, 1_000, "2025-05-01T10:00:00Z"),
            detail("u2", "Music", BookingStatus::Confirmed, 3_000, "2025-05-03T10:00:00Z"),
        ];
        let report = revenue_report(&rows, chrono_tz::UTC, "$");
        assert_eq!(report.rows[0][0], "2025-05-03");
        assert_eq!(report.summary[3].value, "$20.00");
    }
}
