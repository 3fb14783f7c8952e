use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Bookings,
    Events,
    Users,
    Revenue,
}

impl ReportKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bookings" => Some(ReportKind::Bookings),
            "events" => Some(ReportKind::Events),
            "users" => Some(ReportKind::Users),
            "revenue" => Some(ReportKind::Revenue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Bookings => "bookings",
            ReportKind::Events => "events",
            ReportKind::Users => "users",
            ReportKind::Revenue => "revenue",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Bookings => "Bookings Report",
            ReportKind::Events => "Events Report",
            ReportKind::Users => "Users Report",
            ReportKind::Revenue => "Revenue Report",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryStat {
    pub name: String,
    pub booking_count: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub bookings: i64,
    pub revenue_cents: i64,
    pub unique_customers: i64,
}

/// Confirmed-booking figures for the reports dashboard.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ReportOverview {
    pub total_bookings: i64,
    pub total_revenue_cents: i64,
    pub total_tickets: i64,
    pub unique_customers: i64,
    pub categories: Vec<CategoryStat>,
    pub daily: Vec<DailyRevenue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryItem {
    pub label: String,
    pub value: String,
}

/// A generated report: headline figures plus a table that renders as HTML or CSV.
#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    pub kind: ReportKind,
    pub title: String,
    pub summary: Vec<SummaryItem>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
