use crate::domain::{
    models::event::{AdminEventFilter, Event, EventFilter, EventListing},
    ports::EventRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::warn;

const LISTING_SELECT: &str = "
    SELECT e.*,
           c.name AS category_name,
           (u.first_name || ' ' || u.last_name) AS creator_name,
           COALESCE((SELECT SUM(b.quantity) FROM bookings b
                     WHERE b.event_id = e.id AND b.status IN ('pending', 'confirmed')), 0)::BIGINT AS held_seats,
           (SELECT COUNT(*) FROM bookings b WHERE b.event_id = e.id) AS booking_count,
           COALESCE((SELECT SUM(b.total_cents) FROM bookings b
                     WHERE b.event_id = e.id AND b.status = 'confirmed'), 0)::BIGINT AS revenue_cents
    FROM events e
    JOIN categories c ON c.id = e.category_id
    JOIN users u ON u.id = e.created_by";

pub struct PostgresEventRepo {
    pool: PgPool,
}

impl PostgresEventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepo {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(
            "INSERT INTO events (id, title, description, category_id, image_url, start_at, end_at, location, capacity, price_cents, status, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *"
        )
            .bind(&event.id).bind(&event.title).bind(&event.description).bind(&event.category_id)
            .bind(&event.image_url).bind(event.start_at).bind(event.end_at).bind(&event.location)
            .bind(event.capacity).bind(event.price_cents).bind(event.status.as_str()).bind(&event.created_by)
            .bind(event.created_at).bind(event.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn update(&self, event: &Event) -> Result<Event, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // The row lock taken by the UPDATE serializes this with the booking capacity check.
        let updated = sqlx::query_as::<_, Event>(
            "UPDATE events SET title = $1, description = $2, category_id = $3, image_url = $4, start_at = $5, end_at = $6,
                    location = $7, capacity = $8, price_cents = $9, status = $10, updated_at = $11
             WHERE id = $12
             RETURNING *"
        )
            .bind(&event.title).bind(&event.description).bind(&event.category_id).bind(&event.image_url)
            .bind(event.start_at).bind(event.end_at).bind(&event.location).bind(event.capacity)
            .bind(event.price_cents).bind(event.status.as_str()).bind(event.updated_at)
            .bind(&event.id)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Event not found".into()))?;

        let held: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM bookings WHERE event_id = $1 AND status IN ('pending', 'confirmed')"
        )
            .bind(&event.id)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
        if (updated.capacity as i64) < held {
            warn!(event_id = %event.id, held, capacity = updated.capacity, "Capacity edit below held seats");
            return Err(AppError::Conflict(format!("Capacity cannot be lower than the {} seats already booked", held)));
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_listing(&self, id: &str) -> Result<Option<EventListing>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(LISTING_SELECT);
        qb.push(" WHERE e.id = ").push_bind(id);
        qb.build_query_as::<EventListing>()
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_public(&self, filter: &EventFilter, now: DateTime<Utc>) -> Result<Vec<EventListing>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(LISTING_SELECT);
        qb.push(" WHERE e.status = 'published' AND e.end_at >= ").push_bind(now);

        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (e.title ILIKE ").push_bind(pattern.clone())
                .push(" OR e.description ILIKE ").push_bind(pattern.clone())
                .push(" OR e.location ILIKE ").push_bind(pattern)
                .push(")");
        }
        if let Some(category_id) = &filter.category_id {
            qb.push(" AND e.category_id = ").push_bind(category_id.clone());
        }
        if let Some((start, end)) = filter.starts_between {
            qb.push(" AND e.start_at >= ").push_bind(start)
                .push(" AND e.start_at < ").push_bind(end);
        }
        if let Some(band) = filter.price {
            let (low, high) = band.bounds();
            qb.push(" AND e.price_cents >= ").push_bind(low);
            if let Some(high) = high {
                qb.push(" AND e.price_cents < ").push_bind(high);
            }
        }
        qb.push(" ORDER BY ").push(filter.sort.order_by());

        qb.build_query_as::<EventListing>()
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_upcoming(&self, from: DateTime<Utc>, limit: i64) -> Result<Vec<EventListing>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(LISTING_SELECT);
        qb.push(" WHERE e.status = 'published' AND e.start_at >= ").push_bind(from)
            .push(" ORDER BY e.start_at ASC LIMIT ").push_bind(limit);
        qb.build_query_as::<EventListing>()
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_upcoming(&self, from: DateTime<Utc>) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE status = 'published' AND start_at >= $1")
            .bind(from)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_admin(&self, filter: &AdminEventFilter) -> Result<Vec<EventListing>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(LISTING_SELECT);
        qb.push(" WHERE 1 = 1");

        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (e.title ILIKE ").push_bind(pattern.clone())
                .push(" OR e.description ILIKE ").push_bind(pattern.clone())
                .push(" OR e.location ILIKE ").push_bind(pattern)
                .push(")");
        }
        if let Some(category_id) = &filter.category_id {
            qb.push(" AND e.category_id = ").push_bind(category_id.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND e.status = ").push_bind(status.as_str());
        }
        if let Some(from) = filter.created_from {
            qb.push(" AND e.created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.created_to {
            qb.push(" AND e.created_at < ").push_bind(to);
        }
        qb.push(" ORDER BY e.start_at DESC");

        qb.build_query_as::<EventListing>()
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_all(&self) -> Result<i64, AppError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "DELETE FROM events WHERE id = $1 AND NOT EXISTS (SELECT 1 FROM bookings WHERE event_id = $1)"
        )
            .bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(id).await? {
                Some(_) => Err(AppError::Conflict("Cannot delete event with existing bookings".into())),
                None => Err(AppError::NotFound("Event not found".into())),
            };
        }
        Ok(())
    }
}
