use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;

use carpool_core::repository::{RideRepository, SeatInventory, SeatedTransition};
use carpool_core::search::RideSearchRequest;
use carpool_core::{ConflictKind, CoreError, CoreResult};
use carpool_shared::{BookingStatus, Page, PageRequest, Ride};

use crate::booking_repo::compare_and_set;
use crate::error::StoreError;

/// Rides table access. Also owns the seat counter, which lives on the ride row.
pub struct PgRideRepository {
    pool: PgPool,
}

impl PgRideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RideRow {
    id: Uuid,
    driver_id: Uuid,
    source: String,
    destination: String,
    ride_date: NaiveDate,
    ride_time: NaiveTime,
    total_seats: i32,
    available_seats: i32,
    price_per_seat: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RideRow> for Ride {
    fn from(row: RideRow) -> Self {
        Ride {
            id: row.id,
            driver_id: row.driver_id,
            source: row.source,
            destination: row.destination,
            ride_date: row.ride_date,
            ride_time: row.ride_time,
            total_seats: row.total_seats,
            available_seats: row.available_seats,
            price_per_seat: row.price_per_seat,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const RIDE_COLUMNS: &str = "id, driver_id, source, destination, ride_date, ride_time, \
    total_seats, available_seats, price_per_seat, created_at, updated_at";

#[async_trait]
impl RideRepository for PgRideRepository {
    async fn create_ride(&self, ride: &Ride) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rides (id, driver_id, source, destination, ride_date, ride_time,
                               total_seats, available_seats, price_per_seat, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(ride.id)
        .bind(ride.driver_id)
        .bind(&ride.source)
        .bind(&ride.destination)
        .bind(ride.ride_date)
        .bind(ride.ride_time)
        .bind(ride.total_seats)
        .bind(ride.available_seats)
        .bind(ride.price_per_seat)
        .bind(ride.created_at)
        .bind(ride.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn get_ride(&self, id: Uuid) -> CoreResult<Option<Ride>> {
        let row = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {} FROM rides WHERE id = $1",
            RIDE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(row.map(Ride::from))
    }

    async fn search_rides(
        &self,
        query: &RideSearchRequest,
        page: PageRequest,
    ) -> CoreResult<Page<Ride>> {
        let filter = "LOWER(source) = LOWER($1) AND LOWER(destination) = LOWER($2) \
            AND ride_date = $3 AND available_seats > 0";

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM rides WHERE {}", filter))
            .bind(&query.source)
            .bind(&query.destination)
            .bind(query.ride_date)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let rows = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {} FROM rides WHERE {} ORDER BY ride_time, id LIMIT $4 OFFSET $5",
            RIDE_COLUMNS, filter
        ))
        .bind(&query.source)
        .bind(&query.destination)
        .bind(query.ride_date)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(Page::new(rows.into_iter().map(Ride::from).collect(), page, total as u64))
    }

    async fn list_driver_rides(&self, driver_id: Uuid, page: PageRequest) -> CoreResult<Page<Ride>> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rides WHERE driver_id = $1")
            .bind(driver_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let rows = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {} FROM rides WHERE driver_id = $1 ORDER BY created_at DESC, id LIMIT $2 OFFSET $3",
            RIDE_COLUMNS
        ))
        .bind(driver_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(Page::new(rows.into_iter().map(Ride::from).collect(), page, total as u64))
    }
}

/// Conditional decrement; the row lock taken by UPDATE makes the guard and
/// the decrement one step. `None` when the ride is full or missing.
async fn take_seat<'e, E: PgExecutor<'e>>(executor: E, ride_id: Uuid) -> Result<Option<i32>, StoreError> {
    let remaining: Option<(i32,)> = sqlx::query_as(
        r#"
        UPDATE rides
        SET available_seats = available_seats - 1, updated_at = NOW()
        WHERE id = $1 AND available_seats > 0
        RETURNING available_seats
        "#,
    )
    .bind(ride_id)
    .fetch_optional(executor)
    .await?;
    Ok(remaining.map(|(left,)| left))
}

async fn return_seat<'e, E: PgExecutor<'e>>(executor: E, ride_id: Uuid) -> Result<Option<i32>, StoreError> {
    let remaining: Option<(i32,)> = sqlx::query_as(
        r#"
        UPDATE rides
        SET available_seats = LEAST(available_seats + 1, total_seats), updated_at = NOW()
        WHERE id = $1
        RETURNING available_seats
        "#,
    )
    .bind(ride_id)
    .fetch_optional(executor)
    .await?;
    Ok(remaining.map(|(left,)| left))
}

/// Current counter, row-locked until the surrounding transaction ends.
async fn lock_seats<'e, E: PgExecutor<'e>>(executor: E, ride_id: Uuid) -> Result<Option<i32>, StoreError> {
    let seats: Option<(i32,)> =
        sqlx::query_as("SELECT available_seats FROM rides WHERE id = $1 FOR UPDATE")
            .bind(ride_id)
            .fetch_optional(executor)
            .await?;
    Ok(seats.map(|(left,)| left))
}

/// Why `take_seat` came back empty.
async fn no_seat_error<'e, E: PgExecutor<'e>>(executor: E, ride_id: Uuid) -> CoreResult<CoreError> {
    let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM rides WHERE id = $1")
        .bind(ride_id)
        .fetch_optional(executor)
        .await
        .map_err(StoreError::from)?;
    Ok(match found {
        Some(_) => ConflictKind::NoSeats.into(),
        None => CoreError::not_found("Ride", ride_id),
    })
}

// Confirm and cancel both lock the ride row before the booking row, so two
// transactions on the same ride always queue in the same order.
#[async_trait]
impl SeatInventory for PgRideRepository {
    async fn reserve(&self, ride_id: Uuid) -> CoreResult<i32> {
        match take_seat(&self.pool, ride_id).await? {
            Some(left) => {
                debug!(%ride_id, left, "seat reserved");
                Ok(left)
            }
            None => Err(no_seat_error(&self.pool, ride_id).await?),
        }
    }

    async fn release(&self, ride_id: Uuid) -> CoreResult<i32> {
        let left = return_seat(&self.pool, ride_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Ride", ride_id))?;
        debug!(%ride_id, left, "seat released");
        Ok(left)
    }

    async fn confirm(&self, booking_id: Uuid, ride_id: Uuid) -> CoreResult<Option<SeatedTransition>> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        // An early return drops `tx`, which rolls it back.
        let Some(available_seats) = take_seat(&mut *tx, ride_id).await? else {
            return Err(no_seat_error(&mut *tx, ride_id).await?);
        };

        let Some(booking) = compare_and_set(
            &mut *tx,
            booking_id,
            BookingStatus::Requested,
            BookingStatus::Confirmed,
        )
        .await?
        else {
            tx.rollback().await.map_err(StoreError::from)?;
            return Ok(None);
        };

        tx.commit().await.map_err(StoreError::from)?;
        debug!(%ride_id, %booking_id, available_seats, "seat taken by confirmation");
        Ok(Some(SeatedTransition {
            booking,
            available_seats,
        }))
    }

    async fn cancel(
        &self,
        booking_id: Uuid,
        ride_id: Uuid,
        previous: BookingStatus,
    ) -> CoreResult<Option<SeatedTransition>> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        let seats = lock_seats(&mut *tx, ride_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Ride", ride_id))?;

        let Some(booking) =
            compare_and_set(&mut *tx, booking_id, previous, BookingStatus::Cancelled).await?
        else {
            tx.rollback().await.map_err(StoreError::from)?;
            return Ok(None);
        };

        let available_seats = if previous.holds_seat() {
            return_seat(&mut *tx, ride_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Ride", ride_id))?
        } else {
            seats
        };

        tx.commit().await.map_err(StoreError::from)?;
        debug!(%ride_id, %booking_id, available_seats, "booking cancelled");
        Ok(Some(SeatedTransition {
            booking,
            available_seats,
        }))
    }
}
