use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use carpool_core::repository::BookingRepository;
use carpool_core::{ConflictKind, CoreResult};
use carpool_shared::{Booking, BookingStatus, Page, PageRequest};

use crate::error::{map_insert_error, StoreError};

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    ride_id: Uuid,
    passenger_id: Uuid,
    status: String,
    booked_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<BookingStatus>().map_err(StoreError::CorruptRow)?;
        Ok(Booking {
            id: row.id,
            ride_id: row.ride_id,
            passenger_id: row.passenger_id,
            status,
            booked_at: row.booked_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, StoreError> {
    rows.into_iter().map(Booking::try_from).collect()
}

const BOOKING_COLUMNS: &str = "b.id, b.ride_id, b.passenger_id, b.status, b.booked_at, b.updated_at";

/// Compare-and-set on status. `None` when the stored status was no longer
/// `expected`. Runs on whatever executor it is given, so seat changes can
/// share its transaction.
pub(crate) async fn compare_and_set<'e, E>(
    executor: E,
    id: Uuid,
    expected: BookingStatus,
    next: BookingStatus,
) -> Result<Option<Booking>, StoreError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        r#"
        UPDATE bookings b
        SET status = $3, updated_at = NOW()
        WHERE b.id = $1 AND b.status = $2
        RETURNING {}
        "#,
        BOOKING_COLUMNS
    ))
    .bind(id)
    .bind(expected.as_str())
    .bind(next.as_str())
    .fetch_optional(executor)
    .await?;

    row.map(Booking::try_from).transpose()
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, ride_id, passenger_id, status, booked_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(booking.id)
        .bind(booking.ride_id)
        .bind(booking.passenger_id)
        .bind(booking.status.as_str())
        .bind(booking.booked_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(e, |constraint| {
                (constraint == "unique_ride_passenger").then_some(ConflictKind::DuplicateBooking)
            })
        })?;
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings b WHERE b.id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(row.map(Booking::try_from).transpose()?)
    }

    async fn find_by_ride_and_passenger(
        &self,
        ride_id: Uuid,
        passenger_id: Uuid,
    ) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings b WHERE b.ride_id = $1 AND b.passenger_id = $2",
            BOOKING_COLUMNS
        ))
        .bind(ride_id)
        .bind(passenger_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(row.map(Booking::try_from).transpose()?)
    }

    async fn list_passenger_bookings(
        &self,
        passenger_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Page<Booking>> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE passenger_id = $1")
            .bind(passenger_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings b WHERE b.passenger_id = $1 \
             ORDER BY b.booked_at DESC, b.id LIMIT $2 OFFSET $3",
            BOOKING_COLUMNS
        ))
        .bind(passenger_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(Page::new(into_bookings(rows)?, page, total as u64))
    }

    async fn list_driver_bookings(
        &self,
        driver_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Page<Booking>> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings b JOIN rides r ON r.id = b.ride_id WHERE r.driver_id = $1",
        )
        .bind(driver_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)?;

        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings b JOIN rides r ON r.id = b.ride_id WHERE r.driver_id = $1 \
             ORDER BY b.booked_at DESC, b.id LIMIT $2 OFFSET $3",
            BOOKING_COLUMNS
        ))
        .bind(driver_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(Page::new(into_bookings(rows)?, page, total as u64))
    }

    async fn count_with_status(&self, ride_id: Uuid, status: BookingStatus) -> CoreResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE ride_id = $1 AND status = $2")
                .bind(ride_id)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::from)?;
        Ok(count)
    }
}
