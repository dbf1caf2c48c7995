use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carpool_shared::{Booking, BookingStatus, Ride};

#[derive(Debug, Clone, Deserialize)]
pub struct RideSearchRequest {
    pub source: String,
    pub destination: String,
    pub ride_date: NaiveDate,
}

impl RideSearchRequest {
    pub fn is_complete(&self) -> bool {
        !self.source.trim().is_empty() && !self.destination.trim().is_empty()
    }

    /// Places without surrounding whitespace, as rides are stored.
    pub fn trimmed(&self) -> Self {
        Self {
            source: self.source.trim().to_string(),
            destination: self.destination.trim().to_string(),
            ride_date: self.ride_date,
        }
    }
}

/// A ride as shown to callers, with the driver's display name joined in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RideView {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub driver_username: String,
    pub source: String,
    pub destination: String,
    pub ride_date: NaiveDate,
    pub ride_time: NaiveTime,
    pub total_seats: i32,
    pub available_seats: i32,
    pub booked_seats: i32,
    pub price_per_seat: f64,
}

impl RideView {
    pub fn new(ride: Ride, driver_username: String) -> Self {
        Self {
            id: ride.id,
            driver_id: ride.driver_id,
            driver_username,
            booked_seats: ride.booked_seats(),
            source: ride.source,
            destination: ride.destination,
            ride_date: ride.ride_date,
            ride_time: ride.ride_time,
            total_seats: ride.total_seats,
            available_seats: ride.available_seats,
            price_per_seat: ride.price_per_seat,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingView {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub passenger_username: String,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingView {
    pub fn new(booking: Booking, passenger_username: String) -> Self {
        Self {
            id: booking.id,
            ride_id: booking.ride_id,
            passenger_id: booking.passenger_id,
            passenger_username,
            status: booking.status,
            booked_at: booking.booked_at,
            updated_at: booking.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_deserialization() {
        let json = r#"
            {
                "source": "Pune",
                "destination": "Mumbai",
                "ride_date": "2030-12-25"
            }
        "#;
        let req: RideSearchRequest = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(req.source, "Pune");
        assert_eq!(req.ride_date, NaiveDate::from_ymd_opt(2030, 12, 25).unwrap());
        assert!(req.is_complete());
    }

    #[test]
    fn test_ride_view_counts_booked_seats() {
        let mut ride = Ride::new(
            Uuid::new_v4(),
            "Pune".to_string(),
            "Mumbai".to_string(),
            NaiveDate::from_ymd_opt(2030, 12, 25).unwrap(),
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            4,
            99.5,
        );
        ride.available_seats = 1;
        let view = RideView::new(ride, "dave".to_string());
        assert_eq!(view.booked_seats, 3);
        assert_eq!(view.driver_username, "dave");
    }
}
