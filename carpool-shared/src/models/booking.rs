use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Booking status in the lifecycle. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Requested,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "REQUESTED",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether this booking currently holds one of the ride's seats.
    pub fn holds_seat(&self) -> bool {
        matches!(self, BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUESTED" => Ok(BookingStatus::Requested),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// A passenger's claim against a ride. Never deleted, only cancelled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(ride_id: Uuid, passenger_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ride_id,
            passenger_id,
            status: BookingStatus::Requested,
            booked_at: now,
            updated_at: now,
        }
    }

    pub fn update_status(&mut self, status: BookingStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_booking_is_requested() {
        let booking = Booking::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(booking.status, BookingStatus::Requested);
        assert!(!booking.status.holds_seat());
    }

    #[test]
    fn test_status_parses_db_representation() {
        for status in [
            BookingStatus::Requested,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<BookingStatus>().is_err());
    }
}
