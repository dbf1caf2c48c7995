use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;

use carpool_core::{CoreError, CoreResult};
use carpool_shared::Ride;

const PLACE_MIN_LEN: usize = 2;
const PLACE_MAX_LEN: usize = 100;

/// What a driver submits when offering a ride.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRide {
    pub source: String,
    pub destination: String,
    pub ride_date: NaiveDate,
    pub ride_time: NaiveTime,
    pub total_seats: i32,
    pub price_per_seat: f64,
}

impl NewRide {
    /// Boundary validation. `today` is passed in so callers control the clock.
    pub fn validate(&self, today: NaiveDate) -> CoreResult<()> {
        check_place("source", &self.source)?;
        check_place("destination", &self.destination)?;
        if self.ride_date < today {
            return Err(CoreError::Validation(
                "Ride date must be today or in the future".to_string(),
            ));
        }
        self.check_amounts()
    }

    /// The part of validation that guards ride invariants, enforced on every create.
    pub(crate) fn check_amounts(&self) -> CoreResult<()> {
        if self.total_seats <= 0 {
            return Err(CoreError::Validation(
                "Total seats must be greater than 0".to_string(),
            ));
        }
        if !(self.price_per_seat.is_finite() && self.price_per_seat > 0.0) {
            return Err(CoreError::Validation(
                "Price per seat must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_ride(self, driver_id: Uuid) -> Ride {
        Ride::new(
            driver_id,
            self.source.trim().to_string(),
            self.destination.trim().to_string(),
            self.ride_date,
            self.ride_time,
            self.total_seats,
            self.price_per_seat,
        )
    }
}

fn check_place(field: &str, value: &str) -> CoreResult<()> {
    let len = value.trim().chars().count();
    if !(PLACE_MIN_LEN..=PLACE_MAX_LEN).contains(&len) {
        return Err(CoreError::Validation(format!(
            "{} must be between {} and {} characters",
            field, PLACE_MIN_LEN, PLACE_MAX_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    }

    fn valid() -> NewRide {
        NewRide {
            source: " Pune ".to_string(),
            destination: "Mumbai".to_string(),
            ride_date: today(),
            ride_time: NaiveTime::from_hms_opt(6, 45, 0).unwrap(),
            total_seats: 3,
            price_per_seat: 300.0,
        }
    }

    #[test]
    fn test_valid_offer_passes_and_trims() {
        let offer = valid();
        offer.validate(today()).unwrap();
        let ride = offer.into_ride(Uuid::new_v4());
        assert_eq!(ride.source, "Pune");
        assert_eq!(ride.available_seats, 3);
    }

    #[test]
    fn test_rejects_past_date_and_bad_amounts() {
        let mut past = valid();
        past.ride_date = today().pred_opt().unwrap();
        assert!(matches!(past.validate(today()), Err(CoreError::Validation(_))));

        let mut no_seats = valid();
        no_seats.total_seats = 0;
        assert!(matches!(no_seats.validate(today()), Err(CoreError::Validation(_))));

        let mut free = valid();
        free.price_per_seat = 0.0;
        assert!(matches!(free.validate(today()), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_rejects_short_place_names() {
        let mut short = valid();
        short.destination = " M ".to_string();
        assert!(matches!(short.validate(today()), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_deserializes_from_json() {
        let json = r#"{
            "source": "Pune",
            "destination": "Mumbai",
            "ride_date": "2030-06-01",
            "ride_time": "07:30:00",
            "total_seats": 4,
            "price_per_seat": 250.5
        }"#;
        let offer: NewRide = serde_json::from_str(json).unwrap();
        assert_eq!(offer.total_seats, 4);
        assert_eq!(offer.ride_time, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
    }
}
