use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use carpool_shared::{Booking, BookingStatus, Page, PageRequest, Ride, User};

use crate::search::RideSearchRequest;
use crate::CoreResult;

/// Repository trait for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict(DuplicateUsername | DuplicateEmail)` when either is taken.
    async fn create_user(&self, user: &User) -> CoreResult<()>;

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>>;

    /// Display names for a batch of ids. Unknown ids are simply absent.
    async fn usernames(&self, ids: &[Uuid]) -> CoreResult<HashMap<Uuid, String>>;
}

/// Repository trait for ride offers.
#[async_trait]
pub trait RideRepository: Send + Sync {
    async fn create_ride(&self, ride: &Ride) -> CoreResult<()>;

    async fn get_ride(&self, id: Uuid) -> CoreResult<Option<Ride>>;

    /// Case-insensitive source/destination, exact date, `available_seats > 0`,
    /// ordered by ride time then id.
    async fn search_rides(
        &self,
        query: &RideSearchRequest,
        page: PageRequest,
    ) -> CoreResult<Page<Ride>>;

    /// Every ride of a driver regardless of seats, newest first.
    async fn list_driver_rides(&self, driver_id: Uuid, page: PageRequest) -> CoreResult<Page<Ride>>;
}

/// Repository trait for bookings.
///
/// The store enforces uniqueness of `(ride_id, passenger_id)`.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Fails with `Conflict(DuplicateBooking)` when the pair already exists.
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()>;

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    async fn find_by_ride_and_passenger(
        &self,
        ride_id: Uuid,
        passenger_id: Uuid,
    ) -> CoreResult<Option<Booking>>;

    async fn list_passenger_bookings(
        &self,
        passenger_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Page<Booking>>;

    /// Bookings on any ride driven by `driver_id`, newest first.
    async fn list_driver_bookings(
        &self,
        driver_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Page<Booking>>;

    async fn count_with_status(&self, ride_id: Uuid, status: BookingStatus) -> CoreResult<i64>;
}

/// A booking status change and the seat count of its ride right after it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatedTransition {
    pub booking: Booking,
    pub available_seats: i32,
}

/// Owner of the per-ride seat counter.
///
/// `confirm` and `cancel` change the counter and the booking status as one
/// unit: either both are written or neither is.
#[async_trait]
pub trait SeatInventory: Send + Sync {
    /// Indivisible check-and-decrement. Returns the seats left, or
    /// `Conflict(NoSeats)` when none were free at that instant.
    async fn reserve(&self, ride_id: Uuid) -> CoreResult<i32>;

    /// Gives one seat back, never going above `total_seats`.
    async fn release(&self, ride_id: Uuid) -> CoreResult<i32>;

    /// Takes a seat and moves the booking `Requested → Confirmed`.
    ///
    /// `Conflict(NoSeats)` when the ride is full. `Ok(None)` when the booking
    /// was no longer `Requested`; the seat is left untouched in both cases.
    async fn confirm(&self, booking_id: Uuid, ride_id: Uuid) -> CoreResult<Option<SeatedTransition>>;

    /// Moves the booking `previous → Cancelled` and returns its seat when
    /// `previous` held one. `Ok(None)` when the stored status was no longer
    /// `previous`.
    async fn cancel(
        &self,
        booking_id: Uuid,
        ride_id: Uuid,
        previous: BookingStatus,
    ) -> CoreResult<Option<SeatedTransition>>;
}
