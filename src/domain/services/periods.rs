//! Calendar windows computed in the site timezone and returned as UTC bounds.
//!
//! All windows are half-open: `start <= t < end`.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

pub type Window = (DateTime<Utc>, DateTime<Utc>);

/// First instant of `date` in `tz`. Falls back to the UTC reading when midnight is skipped by DST.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

pub fn local_today(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Window covering the whole local days `from..=to`.
pub fn days_window(from: NaiveDate, to: NaiveDate, tz: Tz) -> Window {
    let end = to.checked_add_days(Days::new(1)).unwrap_or(to);
    (local_midnight(from, tz), local_midnight(end, tz))
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

fn calendar_month(date: NaiveDate, tz: Tz) -> Window {
    let first = month_start(date);
    (local_midnight(first, tz), local_midnight(add_months(first, 1), tz))
}

/// Date filter of the public catalogue, applied to event start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDateFilter {
    Today,
    Tomorrow,
    ThisWeek,
    ThisMonth,
    NextMonth,
}

impl EventDateFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "tomorrow" => Some(Self::Tomorrow),
            "this-week" | "this_week" => Some(Self::ThisWeek),
            "this-month" | "this_month" => Some(Self::ThisMonth),
            "next-month" | "next_month" => Some(Self::NextMonth),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Tomorrow => "Tomorrow",
            Self::ThisWeek => "This Week",
            Self::ThisMonth => "This Month",
            Self::NextMonth => "Next Month",
        }
    }

    pub fn window(&self, now: DateTime<Utc>, tz: Tz) -> Window {
        let today = local_today(now, tz);
        let plus = |days: u64| today.checked_add_days(Days::new(days)).unwrap_or(today);
        match self {
            Self::Today => days_window(today, today, tz),
            Self::Tomorrow => days_window(plus(1), plus(1), tz),
            Self::ThisWeek => days_window(today, plus(7), tz),
            Self::ThisMonth => days_window(today, add_months(today, 1), tz),
            Self::NextMonth => calendar_month(add_months(month_start(today), 1), tz),
        }
    }
}

/// Period filter of the back office booking list, applied to booking creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedPeriod {
    Today,
    ThisWeek,
    ThisMonth,
}

impl CreatedPeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "this-week" | "this_week" => Some(Self::ThisWeek),
            "this-month" | "this_month" => Some(Self::ThisMonth),
            _ => None,
        }
    }

    pub fn window(&self, now: DateTime<Utc>, tz: Tz) -> Window {
        let today = local_today(now, tz);
        match self {
            Self::Today => days_window(today, today, tz),
            Self::ThisWeek => {
                let monday = today
                    .checked_sub_days(Days::new(today.weekday().num_days_from_monday() as u64))
                    .unwrap_or(today);
                let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
                days_window(monday, sunday, tz)
            }
            Self::ThisMonth => calendar_month(today, tz),
        }
    }
}

/// Calendar month containing `now`, used by the account "this month" filter.
pub fn current_month(now: DateTime<Utc>, tz: Tz) -> Window {
    calendar_month(local_today(now, tz), tz)
}

/// Parses a `YYYY-MM-DD` + `HH:MM` pair entered in the site timezone.
pub fn parse_local_datetime(date: &str, time: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = chrono::NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| chrono::NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .ok()?;
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Report range from optional `YYYY-MM-DD` inputs; defaults to the first of the month through today.
pub fn report_range(start: Option<&str>, end: Option<&str>, now: DateTime<Utc>, tz: Tz) -> (NaiveDate, NaiveDate) {
    let today = local_today(now, tz);
    let parse = |v: Option<&str>| v.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
    let start = parse(start).unwrap_or_else(|| month_start(today));
    let end = parse(end).unwrap_or(today);
    if end < start { (end, start) } else { (start, end) }
}
