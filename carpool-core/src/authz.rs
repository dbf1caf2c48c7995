//! Role and ownership predicates.
//!
//! Nothing here fails or touches storage: every check answers `bool` and the
//! caller decides which error to surface.

use carpool_shared::{Booking, Principal, Ride, Role};
use uuid::Uuid;

/// Things a role may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    OfferRides,
    ListOwnRides,
    RequestBookings,
    ListOwnBookings,
    ConfirmBookings,
    ListRideBookings,
    CancelBookings,
}

impl Capability {
    pub fn granted_to(&self, role: Role) -> bool {
        match self {
            Capability::OfferRides
            | Capability::ListOwnRides
            | Capability::ConfirmBookings
            | Capability::ListRideBookings => role == Role::Driver,
            Capability::RequestBookings | Capability::ListOwnBookings => role == Role::Passenger,
            Capability::CancelBookings => true,
        }
    }
}

pub struct AuthorizationGate;

impl AuthorizationGate {
    pub fn is_driver_of(user_id: Uuid, ride: &Ride) -> bool {
        ride.driver_id == user_id
    }

    pub fn is_passenger_of(user_id: Uuid, booking: &Booking) -> bool {
        booking.passenger_id == user_id
    }

    pub fn has_role(principal: &Principal, role: Role) -> bool {
        principal.role == role
    }

    pub fn has_capability(principal: &Principal, capability: Capability) -> bool {
        capability.granted_to(principal.role)
    }

    /// Either side of a booking may cancel it: the passenger or the ride's driver.
    pub fn can_cancel(user_id: Uuid, booking: &Booking, ride: &Ride) -> bool {
        Self::is_passenger_of(user_id, booking) || Self::is_driver_of(user_id, ride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn ride_for(driver: Uuid) -> Ride {
        Ride::new(
            driver,
            "A".to_string(),
            "B".to_string(),
            NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            2,
            10.0,
        )
    }

    #[test]
    fn test_ownership_predicates() {
        let driver = Uuid::new_v4();
        let passenger = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let ride = ride_for(driver);
        let booking = Booking::new(ride.id, passenger);

        assert!(AuthorizationGate::is_driver_of(driver, &ride));
        assert!(!AuthorizationGate::is_driver_of(passenger, &ride));
        assert!(AuthorizationGate::is_passenger_of(passenger, &booking));

        assert!(AuthorizationGate::can_cancel(driver, &booking, &ride));
        assert!(AuthorizationGate::can_cancel(passenger, &booking, &ride));
        assert!(!AuthorizationGate::can_cancel(stranger, &booking, &ride));
    }

    #[test]
    fn test_capabilities_by_role() {
        let driver = Principal::new(Uuid::new_v4(), Role::Driver);
        let passenger = Principal::new(Uuid::new_v4(), Role::Passenger);

        assert!(AuthorizationGate::has_role(&driver, Role::Driver));
        assert!(!AuthorizationGate::has_role(&driver, Role::Passenger));

        assert!(AuthorizationGate::has_capability(&driver, Capability::ConfirmBookings));
        assert!(!AuthorizationGate::has_capability(&passenger, Capability::ConfirmBookings));
        assert!(AuthorizationGate::has_capability(&passenger, Capability::RequestBookings));
        assert!(!AuthorizationGate::has_capability(&driver, Capability::RequestBookings));
        assert!(AuthorizationGate::has_capability(&driver, Capability::CancelBookings));
        assert!(AuthorizationGate::has_capability(&passenger, Capability::CancelBookings));
    }
}
