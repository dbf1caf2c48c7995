use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A driver-published offer of seats between two places at a date and time.
///
/// `available_seats` only moves through the seat inventory, and always stays
/// within `0..=total_seats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ride {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub source: String,
    pub destination: String,
    pub ride_date: NaiveDate,
    pub ride_time: NaiveTime,
    pub total_seats: i32,
    pub available_seats: i32,
    pub price_per_seat: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ride {
    pub fn new(
        driver_id: Uuid,
        source: String,
        destination: String,
        ride_date: NaiveDate,
        ride_time: NaiveTime,
        total_seats: i32,
        price_per_seat: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            driver_id,
            source,
            destination,
            ride_date,
            ride_time,
            total_seats,
            available_seats: total_seats,
            price_per_seat,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn booked_seats(&self) -> i32 {
        self.total_seats - self.available_seats
    }

    pub fn has_free_seat(&self) -> bool {
        self.available_seats > 0
    }

    /// Case-insensitive route match plus exact date, as used by search.
    pub fn matches_route(&self, source: &str, destination: &str, date: NaiveDate) -> bool {
        // Full Unicode folding, the same as `LOWER()` in Postgres.
        self.source.to_lowercase() == source.to_lowercase()
            && self.destination.to_lowercase() == destination.to_lowercase()
            && self.ride_date == date
    }
}
