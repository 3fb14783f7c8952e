use crate::domain::models::{
    auth::RefreshTokenRecord,
    booking::{Booking, BookingDetail, BookingFilter, BookingLog, BookingLogEntry, StatusChange, UserBookingFilter},
    category::{Category, CategoryCount},
    event::{AdminEventFilter, Event, EventFilter, EventListing},
    job::Job,
    setting::SettingRow,
    user::{User, UserFilter, UserRole, UserStatus, UserSummary},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// True when another account (not `exclude_id`) already uses the email.
    async fn email_taken(&self, email: &str, exclude_id: Option<&str>) -> Result<bool, AppError>;
    async fn update_profile(&self, user: &User) -> Result<User, AppError>;
    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), AppError>;
    /// Changes the status of a non-admin account. Returns false when nothing matched.
    async fn update_status(&self, id: &str, status: UserStatus) -> Result<bool, AppError>;
    async fn count_by_role(&self, role: UserRole) -> Result<i64, AppError>;
    async fn list_with_stats(&self, filter: &UserFilter) -> Result<Vec<UserSummary>, AppError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<Category, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Category>, AppError>;
    async fn list(&self) -> Result<Vec<Category>, AppError>;
    /// Categories with their number of events. With `upcoming_from`, only published events
    /// starting at or after that instant are counted and empty categories are dropped.
    async fn list_with_counts(&self, upcoming_from: Option<DateTime<Utc>>) -> Result<Vec<CategoryCount>, AppError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event, AppError>;
    async fn update(&self, event: &Event) -> Result<Event, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError>;
    async fn find_listing(&self, id: &str) -> Result<Option<EventListing>, AppError>;
    /// Published events that have not ended by `now`.
    async fn list_public(&self, filter: &EventFilter, now: DateTime<Utc>) -> Result<Vec<EventListing>, AppError>;
    /// Published events starting at or after `from`, soonest first.
    async fn list_upcoming(&self, from: DateTime<Utc>, limit: i64) -> Result<Vec<EventListing>, AppError>;
    async fn count_upcoming(&self, from: DateTime<Utc>) -> Result<i64, AppError>;
    async fn list_admin(&self, filter: &AdminEventFilter) -> Result<Vec<EventListing>, AppError>;
    async fn count_all(&self) -> Result<i64, AppError>;
    /// Deletes an event that has no bookings. Fails with Conflict otherwise.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts a pending booking after re-checking capacity under a lock on the event row.
    /// Fails with Conflict when the seats are no longer available.
    async fn create_checked(&self, booking: &Booking, log: &BookingLog) -> Result<Booking, AppError>;
    /// Applies a status change and its log entry in one transaction. Fails with Conflict when the
    /// booking moved on concurrently or, for re-confirmations, when capacity is exhausted.
    async fn apply_status_change(&self, change: &StatusChange) -> Result<Booking, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn find_detail(&self, id: &str) -> Result<Option<BookingDetail>, AppError>;
    async fn held_seats(&self, event_id: &str) -> Result<i64, AppError>;
    async fn count_for_event(&self, event_id: &str) -> Result<i64, AppError>;
    async fn list_for_user(&self, user_id: &str, filter: &UserBookingFilter) -> Result<Vec<BookingDetail>, AppError>;
    /// Number of bookings and the confirmed spend of a user.
    async fn user_totals(&self, user_id: &str) -> Result<(i64, i64), AppError>;
    async fn list_admin(&self, filter: &BookingFilter) -> Result<Vec<BookingDetail>, AppError>;
    async fn count_all(&self) -> Result<i64, AppError>;
    async fn list_logs(&self, booking_id: &str) -> Result<Vec<BookingLogEntry>, AppError>;
    async fn list_confirmed_for_event(&self, event_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn list_stale_pending(&self, created_before: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
}

#[async_trait]
pub trait SettingRepository: Send + Sync {
    async fn all(&self) -> Result<Vec<SettingRow>, AppError>;
    /// Upserts every pair in a single transaction.
    async fn upsert_many(&self, pairs: &[(String, String)], updated_by: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;
    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError>;
    async fn delete_refresh_token(&self, token_hash: &str) -> Result<(), AppError>;
    async fn delete_refresh_family(&self, family_id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<Job, AppError>;
    async fn find_pending(&self, limit: i32) -> Result<Vec<Job>, AppError>;
    async fn update_status(&self, id: &str, status: &str, error_message: Option<String>) -> Result<(), AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str, attachment_name: Option<&str>, attachment_data: Option<&[u8]>) -> Result<(), AppError>;
}

/// Stores uploaded event images and hands back their public URL.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, extension: &str, data: &[u8]) -> Result<String, AppError>;
    async fn delete(&self, url: &str) -> Result<(), AppError>;
}
