use crate::domain::{
    models::booking::{
        Booking, BookingDetail, BookingFilter, BookingLog, BookingLogEntry, StatusChange, UserBookingFilter,
    },
    ports::BookingRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::warn;

const DETAIL_SELECT: &str = "
    SELECT b.*,
           e.title AS event_title,
           e.start_at AS event_start_at,
           e.end_at AS event_end_at,
           e.location AS event_location,
           e.description AS event_description,
           e.price_cents AS event_price_cents,
           c.name AS category_name,
           u.first_name AS customer_first_name,
           u.last_name AS customer_last_name,
           u.email AS customer_email
    FROM bookings b
    JOIN events e ON e.id = b.event_id
    JOIN categories c ON c.id = e.category_id
    JOIN users u ON u.id = b.user_id";

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Locks the event row for the rest of the transaction and reads capacity and held seats.
async fn lock_event_seats(conn: &mut PgConnection, event_id: &str, published_only: bool) -> Result<Option<(i64, i64)>, AppError> {
    let sql = if published_only {
        "SELECT capacity::BIGINT FROM events WHERE id = $1 AND status = 'published' FOR UPDATE"
    } else {
        "SELECT capacity::BIGINT FROM events WHERE id = $1 FOR UPDATE"
    };
    let capacity: Option<i64> = sqlx::query_scalar(sql)
        .bind(event_id)
        .fetch_optional(&mut *conn).await.map_err(AppError::Database)?;
    let Some(capacity) = capacity else {
        return Ok(None);
    };

    let held: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM bookings
         WHERE event_id = $1 AND status IN ('pending', 'confirmed')"
    )
        .bind(event_id)
        .fetch_one(&mut *conn).await.map_err(AppError::Database)?;
    Ok(Some((capacity, held)))
}

async fn insert_log(conn: &mut PgConnection, log: &BookingLog) -> Result<(), AppError> {
    sqlx::query("INSERT INTO booking_logs (id, booking_id, action, actor_id, created_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(&log.id).bind(&log.booking_id).bind(&log.action).bind(&log.actor_id).bind(log.created_at)
        .execute(&mut *conn).await.map_err(AppError::Database)?;
    Ok(())
}

#[async_trait]
impl BookingRepository for PostgresBookingRepo {
    async fn create_checked(&self, booking: &Booking, log: &BookingLog) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let (capacity, held) = lock_event_seats(&mut tx, &booking.event_id, true).await?
            .ok_or(AppError::Conflict("Event is not available for booking".into()))?;

        if held + booking.quantity as i64 > capacity {
            warn!(event_id = %booking.event_id, held, capacity, requested = booking.quantity, "Capacity re-check failed");
            return Err(AppError::Conflict("Sorry, these tickets are no longer available".into()));
        }

        let created = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (id, event_id, user_id, quantity, total_cents, status, payment_status, payment_date, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *"
        )
            .bind(&booking.id).bind(&booking.event_id).bind(&booking.user_id).bind(booking.quantity)
            .bind(booking.total_cents).bind(booking.status.as_str()).bind(booking.payment_status.as_str())
            .bind(booking.payment_date).bind(booking.created_at).bind(booking.updated_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        insert_log(&mut tx, log).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn apply_status_change(&self, change: &StatusChange) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        if change.recheck_capacity {
            let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
                .bind(&change.booking_id)
                .fetch_optional(&mut *tx).await.map_err(AppError::Database)?
                .ok_or(AppError::NotFound("Booking not found".into()))?;

            let (capacity, held) = lock_event_seats(&mut tx, &booking.event_id, false).await?
                .ok_or(AppError::NotFound("Event not found".into()))?;

            if held + booking.quantity as i64 > capacity {
                return Err(AppError::Conflict("Not enough seats left to confirm this booking".into()));
            }
        }

        let updated = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $1, payment_status = $2, payment_date = COALESCE($3, payment_date), updated_at = $4
             WHERE id = $5 AND status = $6
             RETURNING *"
        )
            .bind(change.to.as_str()).bind(change.payment_status.as_str()).bind(change.payment_date)
            .bind(Utc::now()).bind(&change.booking_id).bind(change.from.as_str())
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?
            .ok_or(AppError::Conflict("Booking was updated by someone else, please try again".into()))?;

        insert_log(&mut tx, &change.log).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_detail(&self, id: &str) -> Result<Option<BookingDetail>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAIL_SELECT);
        qb.push(" WHERE b.id = ").push_bind(id);
        qb.build_query_as::<BookingDetail>()
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn held_seats(&self, event_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM bookings WHERE event_id = $1 AND status IN ('pending', 'confirmed')"
        )
            .bind(event_id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_for_event(&self, event_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_for_user(&self, user_id: &str, filter: &UserBookingFilter) -> Result<Vec<BookingDetail>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAIL_SELECT);
        qb.push(" WHERE b.user_id = ").push_bind(user_id);
        if let Some(status) = filter.status {
            qb.push(" AND b.status = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.event_starts_from {
            qb.push(" AND e.start_at >= ").push_bind(from);
        }
        if let Some(before) = filter.event_starts_before {
            qb.push(" AND e.start_at < ").push_bind(before);
        }
        if filter.newest_event_first {
            qb.push(" ORDER BY e.start_at DESC");
        } else {
            qb.push(" ORDER BY e.start_at ASC");
        }
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        qb.build_query_as::<BookingDetail>()
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn user_totals(&self, user_id: &str) -> Result<(i64, i64), AppError> {
        sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'confirmed' THEN total_cents ELSE 0 END), 0)::BIGINT
             FROM bookings WHERE user_id = ?"
        )
            .bind(user_id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_admin(&self, filter: &BookingFilter) -> Result<Vec<BookingDetail>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAIL_SELECT);
        qb.push(" WHERE 1 = 1");
        if let Some(status) = filter.status {
            qb.push(" AND b.status = ").push_bind(status.as_str());
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (e.title ILIKE ").push_bind(pattern.clone())
                .push(" OR u.email ILIKE ").push_bind(pattern.clone())
                .push(" OR u.first_name ILIKE ").push_bind(pattern.clone())
                .push(" OR u.last_name ILIKE ").push_bind(pattern)
                .push(")");
        }
        if let Some(from) = filter.created_from {
            qb.push(" AND b.created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.created_to {
            qb.push(" AND b.created_at < ").push_bind(to);
        }
        qb.push(" ORDER BY b.created_at DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        qb.build_query_as::<BookingDetail>()
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_all(&self) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_logs(&self, booking_id: &str) -> Result<Vec<BookingLogEntry>, AppError> {
        sqlx::query_as::<_, BookingLogEntry>(
            "SELECT l.id, l.action, (u.first_name || ' ' || u.last_name) AS actor_name, l.created_at
             FROM booking_logs l
             LEFT JOIN users u ON u.id = l.actor_id
             WHERE l.booking_id = $1
             ORDER BY l.created_at DESC"
        )
            .bind(booking_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_confirmed_for_event(&self, event_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE event_id = $1 AND status = 'confirmed'")
            .bind(event_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_stale_pending(&self, created_before: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE status = 'pending' AND created_at < $1")
            .bind(created_before)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
